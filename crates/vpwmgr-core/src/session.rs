//! The single authenticated session.

use crate::error::{Error, Result};
use crate::path::CollectionId;
use crate::store::SecretStore;

/// Credentials of a logged-in user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub vault_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("vault_id", &self.vault_id)
            .finish()
    }
}

impl Session {
    /// The user's own collection.
    pub fn personal_collection(&self) -> CollectionId {
        CollectionId::Personal(self.vault_id.clone())
    }
}

/// Holds at most one session. A new login replaces the old one.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate against the store.
    ///
    /// On rejection the context is left unauthenticated, even if a previous
    /// session existed.
    pub fn login<S: SecretStore>(&mut self, store: &S, id: &str, password: &str) -> Result<&Session> {
        let token = store.login(id, password);
        self.current = None;

        match token? {
            Some(token) if !token.is_empty() => {
                tracing::info!("Logged in as {}", id);
                Ok(&*self.current.insert(Session {
                    token,
                    vault_id: id.to_string(),
                }))
            }
            _ => {
                tracing::info!("Login rejected for {}", id);
                Err(Error::AuthFailed)
            }
        }
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::info!("Logged out {}", session.vault_id);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn session(&self) -> Result<&Session> {
        self.current.as_ref().ok_or(Error::NotAuthenticated)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn vault_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.vault_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn login_populates_session() {
        let store = MemoryStore::new().with_user("alice", "pw");
        let mut ctx = SessionContext::new();
        let session = ctx.login(&store, "alice", "pw").unwrap();
        assert_eq!(session.vault_id, "alice");
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.vault_id(), Some("alice"));
        assert!(ctx.token().is_some());
    }

    #[test]
    fn failed_login_leaves_context_unauthenticated() {
        let store = MemoryStore::new().with_user("alice", "pw").with_user("bob", "pw2");
        let mut ctx = SessionContext::new();
        ctx.login(&store, "alice", "pw").unwrap();

        let err = ctx.login(&store, "bob", "wrong").unwrap_err();
        assert!(matches!(err, Error::AuthFailed));
        assert_eq!(err.to_string(), "Bad Login information");
        assert!(!ctx.is_authenticated());
        assert!(matches!(ctx.session(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn second_login_replaces_first() {
        let store = MemoryStore::new().with_user("alice", "pw").with_user("bob", "pw2");
        let mut ctx = SessionContext::new();
        ctx.login(&store, "alice", "pw").unwrap();
        ctx.login(&store, "bob", "pw2").unwrap();
        assert_eq!(ctx.vault_id(), Some("bob"));

        ctx.logout();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.token(), None);
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session {
            token: "s.abcdef".into(),
            vault_id: "alice".into(),
        };
        assert!(!format!("{session:?}").contains("s.abcdef"));
    }
}
