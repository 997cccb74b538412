//! Core of the vpwmgr password manager.
//!
//! Entries live in a secret store under `collection/group/title` keys. This
//! crate decides what an edit means (new, update, rename, move, overwrite),
//! archives superseded entries, and keeps a snapshot of the collections the
//! logged-in user can see. Front ends drive it through [`PasswordManager`].

pub mod archive;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod path;
pub mod session;
pub mod store;
pub mod validate;

pub use archive::ARCHIVE_GROUP;
pub use error::{Error, Result, StoreError, ValidationError};
pub use index::CollectionIndex;
pub use lifecycle::{classify, Action, Draft};
pub use manager::{Outcome, PasswordManager};
pub use models::{Collection, Entry, EntryFields, Group, Record};
pub use path::{CollectionId, EntryPath};
pub use session::{Session, SessionContext};
pub use store::{MemoryStore, SecretStore, StoreConfig, VaultClient};
