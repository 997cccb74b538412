//! Read model of the collections, groups and entry titles visible to the
//! logged-in user.

use crate::error::Result;
use crate::models::{Collection, Group};
use crate::path::{decode, CollectionId, EntryPath};
use crate::session::Session;
use crate::store::SecretStore;

/// Snapshot of every collection the caller can list.
///
/// The snapshot is rebuilt wholesale by [`CollectionIndex::refresh`]; it is
/// never patched in place.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    collections: Vec<Collection>,
}

impl CollectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-query the store. The personal collection always comes first,
    /// followed by listable team collections ordered by team id.
    pub fn refresh<S: SecretStore>(&mut self, store: &S, session: &Session) -> Result<&[Collection]> {
        self.collections = refresh(store, session)?;
        Ok(&self.collections)
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn find(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, path: &EntryPath) -> bool {
        entry_exists(&self.collections, &path.collection, &path.group, &path.title)
    }

    /// Every entry in the index, collection by collection.
    pub fn entries(&self) -> impl Iterator<Item = EntryPath> + '_ {
        self.collections.iter().flat_map(|collection| {
            collection.groups.iter().flat_map(move |group| {
                group
                    .entry_titles
                    .iter()
                    .map(move |title| EntryPath::new(collection.id.clone(), &group.name, title))
            })
        })
    }

    pub fn entry_count(&self) -> usize {
        self.collections.iter().map(Collection::entry_count).sum()
    }
}

/// Build a fresh snapshot for `session`.
pub fn refresh<S: SecretStore>(store: &S, session: &Session) -> Result<Vec<Collection>> {
    let token = session.token.as_str();
    let personal = session.personal_collection();

    let mut collections = Vec::new();
    collections.push(load_collection(store, token, &personal)?.unwrap_or_else(|| {
        tracing::debug!("Personal collection {} is empty", personal.prefix());
        Collection::new(personal.clone())
    }));

    let mut team_ids: Vec<String> = store
        .list(token, CollectionId::team_root())?
        .unwrap_or_default()
        .iter()
        .filter(|key| key.ends_with('/'))
        .map(|key| decode(key))
        .collect();
    team_ids.sort();
    team_ids.dedup();

    for team in team_ids {
        let id = CollectionId::Team(team);
        match load_collection(store, token, &id)? {
            Some(collection) => collections.push(collection),
            None => tracing::debug!("Team collection {} not listable, skipping", id.prefix()),
        }
    }

    tracing::info!(
        "Refreshed {} collection(s) for {}",
        collections.len(),
        session.vault_id
    );
    Ok(collections)
}

fn load_collection<S: SecretStore>(
    store: &S,
    token: &str,
    id: &CollectionId,
) -> Result<Option<Collection>> {
    let prefix = id.prefix();
    let Some(keys) = store.list(token, &prefix)? else {
        return Ok(None);
    };

    let mut collection = Collection::new(id.clone());
    for key in keys {
        if !key.ends_with('/') {
            tracing::debug!("Ignoring ungrouped key {}{}", prefix, key);
            continue;
        }
        let group_prefix = format!("{prefix}{key}");
        let Some(titles) = store.list(token, &group_prefix)? else {
            continue;
        };
        collection.groups.push(Group {
            name: decode(&key),
            entry_titles: titles
                .iter()
                .filter(|title| !title.ends_with('/'))
                .map(|title| decode(title))
                .collect(),
        });
    }
    Ok(Some(collection))
}

/// True iff `group` exists in `collection` and lists `title` (exact match).
pub fn entry_exists(
    collections: &[Collection],
    collection: &CollectionId,
    group: &str,
    title: &str,
) -> bool {
    collections
        .iter()
        .filter(|c| &c.id == collection)
        .filter_map(|c| c.find_group(group))
        .any(|g| g.contains(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::MemoryStore;

    fn alice() -> CollectionId {
        CollectionId::Personal("alice".into())
    }

    fn seeded() -> (MemoryStore, Session) {
        let store = MemoryStore::new().with_user("alice", "pw");
        for key in [
            "user/alice/network/router",
            "user/alice/web/google.com",
            "user/alice/web/netflix",
            "team/zeta/db/primary",
            "team/alpha/web/portal",
            "team/hidden/x/y",
        ] {
            store.insert(key, Record::default());
        }
        store.deny("alice", "team/hidden/");
        let token = store.login("alice", "pw").unwrap().unwrap();
        let session = Session {
            token,
            vault_id: "alice".into(),
        };
        (store, session)
    }

    #[test]
    fn refresh_orders_personal_then_sorted_teams() {
        let (store, session) = seeded();
        let collections = refresh(&store, &session).unwrap();
        let ids: Vec<_> = collections.iter().map(|c| c.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                alice(),
                CollectionId::Team("alpha".into()),
                CollectionId::Team("zeta".into()),
            ]
        );
    }

    #[test]
    fn refresh_lists_groups_and_titles() {
        let (store, session) = seeded();
        let collections = refresh(&store, &session).unwrap();
        let personal = &collections[0];
        assert_eq!(
            personal.groups,
            vec![
                Group {
                    name: "network".into(),
                    entry_titles: vec!["router".into()],
                },
                Group {
                    name: "web".into(),
                    entry_titles: vec!["google.com".into(), "netflix".into()],
                },
            ]
        );
    }

    #[test]
    fn empty_personal_collection_is_still_present() {
        let store = MemoryStore::new().with_user("carol", "pw");
        let token = store.login("carol", "pw").unwrap().unwrap();
        let session = Session {
            token,
            vault_id: "carol".into(),
        };
        let collections = refresh(&store, &session).unwrap();
        assert_eq!(collections, vec![Collection::new(CollectionId::Personal("carol".into()))]);
    }

    #[test]
    fn group_and_title_names_are_decoded() {
        let store = MemoryStore::new().with_user("alice", "pw");
        store.insert("user/alice/home%20network/%24%2Bdream", Record::default());
        let token = store.login("alice", "pw").unwrap().unwrap();
        let session = Session {
            token,
            vault_id: "alice".into(),
        };
        let collections = refresh(&store, &session).unwrap();
        let group = collections[0].find_group("home network").unwrap();
        assert_eq!(group.entry_titles, vec!["$+dream".to_string()]);
    }

    #[test]
    fn entry_exists_is_exact() {
        let (store, session) = seeded();
        let collections = refresh(&store, &session).unwrap();
        assert!(entry_exists(&collections, &alice(), "web", "google.com"));
        assert!(!entry_exists(&collections, &alice(), "web", "netflix2"));
        assert!(!entry_exists(&collections, &alice(), "web", "Google.com"));
        assert!(!entry_exists(&collections, &alice(), "mail", "google.com"));
        assert!(!entry_exists(
            &collections,
            &CollectionId::Team("alpha".into()),
            "web",
            "google.com"
        ));
    }

    #[test]
    fn index_iterates_every_entry() {
        let (store, session) = seeded();
        let mut index = CollectionIndex::new();
        index.refresh(&store, &session).unwrap();
        assert_eq!(index.entry_count(), 5);
        assert!(index.contains(&EntryPath::new(
            CollectionId::Team("zeta".into()),
            "db",
            "primary"
        )));
        assert_eq!(index.entries().count(), 5);
    }
}
