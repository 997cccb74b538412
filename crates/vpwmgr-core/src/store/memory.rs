//! In-process secret store.
//!
//! Behaves like a Vault key/value mount closely enough for tests and the
//! offline demo: folder-style listing, per-user credentials, forbidden
//! prefixes and injectable write and list failures. Every call is recorded so the
//! order of side effects can be checked.

use super::SecretStore;
use crate::error::StoreError;
use crate::models::{EntryFields, Record};
use crate::path::{CollectionId, EntryPath};
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// One request seen by a [`MemoryStore`], with its key or prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Login(String),
    List(String),
    Read(String),
    Write(String),
    Delete(String),
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Record>,
    passwords: BTreeMap<String, String>,
    tokens: BTreeMap<String, String>,
    denied: Vec<(String, String)>,
    failing_writes: Vec<String>,
    failing_lists: Vec<String>,
    calls: Vec<StoreCall>,
    issued: u64,
}

impl Inner {
    fn user_for(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    /// Whether `token` may touch `key`.
    fn allowed(&self, token: &str, key: &str) -> bool {
        match self.user_for(token) {
            Some(user) => !self
                .denied
                .iter()
                .any(|(u, prefix)| u == user && key.starts_with(prefix.as_str())),
            None => false,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a small personal and team collection.
    pub fn demo() -> Self {
        let store = Self::new().with_user("psparks", "pw");
        let seeded = Utc.with_ymd_and_hms(2017, 3, 4, 9, 0, 0).single();
        let me = CollectionId::Personal("psparks".into());
        let team = CollectionId::Team("linuxadmin".into());

        let rows = [
            (&me, "network", "router", "http://192.168.1.1", "admin"),
            (&me, "web", "google.com", "https://google.com", "psparks"),
            (&me, "web", "netflix", "https://netflix.com", "psparks"),
            (&me, "Pauls Stuff", "$+dream", "", ""),
            (&team, "webservers", "LoadBal", "https://lb.internal", "root"),
            (&team, "webservers", "extA", "https://a.internal", "root"),
            (&team, "webservers", "extB", "https://b.internal", "root"),
        ];
        for (collection, group, title, url, userid) in rows {
            let path = EntryPath::new(collection.clone(), group, title);
            store.insert(
                &path.key(),
                Record {
                    fields: EntryFields {
                        url: url.to_string(),
                        userid: userid.to_string(),
                        password: format!("{title}-secret"),
                        notes: String::new(),
                    },
                    changed: seeded,
                    pw_changed: seeded,
                },
            );
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register credentials accepted by `login`.
    pub fn with_user(self, id: &str, password: &str) -> Self {
        self.lock()
            .passwords
            .insert(id.to_string(), password.to_string());
        self
    }

    /// Make everything under `prefix` invisible and read-only for `user`.
    pub fn deny(&self, user: &str, prefix: &str) {
        self.lock()
            .denied
            .push((user.to_string(), prefix.to_string()));
    }

    /// Make every write under `prefix` fail with a 500 status.
    pub fn fail_writes_under(&self, prefix: &str) {
        self.lock().failing_writes.push(prefix.to_string());
    }

    /// Make every listing under `prefix` fail with a 500 status.
    pub fn fail_lists_under(&self, prefix: &str) {
        self.lock().failing_lists.push(prefix.to_string());
    }

    /// Put a record in place without going through a token.
    pub fn insert(&self, key: &str, record: Record) {
        self.lock().records.insert(key.to_string(), record);
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.lock().records.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().records.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Calls that change stored data, in order.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StoreCall::Write(_) | StoreCall::Delete(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl SecretStore for MemoryStore {
    fn login(&self, id: &str, password: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Login(id.to_string()));
        if inner.passwords.get(id).map(String::as_str) != Some(password) {
            return Ok(None);
        }
        inner.issued += 1;
        let token = format!("token-{}-{}", id, inner.issued);
        inner.tokens.insert(token.clone(), id.to_string());
        Ok(Some(token))
    }

    fn list(&self, token: &str, prefix: &str) -> Result<Option<Vec<String>>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::List(prefix.to_string()));
        if !inner.allowed(token, prefix) {
            return Ok(None);
        }
        if inner.failing_lists.iter().any(|p| prefix.starts_with(p.as_str())) {
            return Err(StoreError::Status {
                op: "list",
                key: prefix.to_string(),
                status: 500,
            });
        }

        let children: BTreeSet<String> = inner
            .records
            .keys()
            .filter_map(|key| key.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .map(|rest| match rest.find('/') {
                Some(i) => rest[..=i].to_string(),
                None => rest.to_string(),
            })
            .collect();

        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(children.into_iter().collect()))
        }
    }

    fn read(&self, token: &str, key: &str) -> Result<Option<Record>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Read(key.to_string()));
        if !inner.allowed(token, key) {
            return Ok(None);
        }
        Ok(inner.records.get(key).cloned())
    }

    fn write(&self, token: &str, key: &str, record: &Record) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Write(key.to_string()));
        if !inner.allowed(token, key) {
            return Err(StoreError::Status {
                op: "write",
                key: key.to_string(),
                status: 403,
            });
        }
        if inner.failing_writes.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(StoreError::Status {
                op: "write",
                key: key.to_string(),
                status: 500,
            });
        }
        inner.records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, token: &str, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Delete(key.to_string()));
        if !inner.allowed(token, key) {
            return Err(StoreError::Status {
                op: "delete",
                key: key.to_string(),
                status: 403,
            });
        }
        inner.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in() -> (MemoryStore, String) {
        let store = MemoryStore::demo();
        let token = store.login("psparks", "pw").unwrap().unwrap();
        (store, token)
    }

    #[test]
    fn login_checks_password() {
        let store = MemoryStore::demo();
        assert_eq!(store.login("psparks", "nope").unwrap(), None);
        assert_eq!(store.login("bozo", "iMaCl0wn").unwrap(), None);
        assert!(store.login("psparks", "pw").unwrap().is_some());
    }

    #[test]
    fn list_returns_immediate_children() {
        let (store, token) = logged_in();
        assert_eq!(
            store.list(&token, "user/psparks/").unwrap(),
            Some(vec![
                "Pauls%20Stuff/".to_string(),
                "network/".to_string(),
                "web/".to_string()
            ])
        );
        assert_eq!(
            store.list(&token, "user/psparks/web/").unwrap(),
            Some(vec!["google.com".to_string(), "netflix".to_string()])
        );
        assert_eq!(
            store.list(&token, "team/").unwrap(),
            Some(vec!["linuxadmin/".to_string()])
        );
        assert_eq!(store.list(&token, "user/nobody/").unwrap(), None);
    }

    #[test]
    fn unknown_token_sees_nothing() {
        let store = MemoryStore::demo();
        assert_eq!(store.list("bogus", "user/psparks/").unwrap(), None);
        assert!(store
            .write("bogus", "user/psparks/web/x", &Record::default())
            .is_err());
    }

    #[test]
    fn denied_prefix_is_hidden_and_read_only() {
        let (store, token) = logged_in();
        store.deny("psparks", "team/linuxadmin/");
        assert_eq!(store.list(&token, "team/linuxadmin/").unwrap(), None);
        assert!(store
            .write(&token, "team/linuxadmin/webservers/x", &Record::default())
            .is_err());
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let (store, token) = logged_in();
        store.clear_calls();
        store.write(&token, "user/psparks/web/a", &Record::default()).unwrap();
        store.delete(&token, "user/psparks/web/a").unwrap();
        assert_eq!(
            store.mutations(),
            vec![
                StoreCall::Write("user/psparks/web/a".into()),
                StoreCall::Delete("user/psparks/web/a".into()),
            ]
        );
        assert_eq!(store.get("user/psparks/web/a"), None);
    }
}
