//! Boundary to the secret store holding the entries.
//!
//! Every call is a single blocking request. Callers rely on that to keep
//! archive, delete and write in order.

pub mod memory;
pub mod vault;

use crate::error::StoreError;
use crate::models::Record;

pub use memory::{MemoryStore, StoreCall};
pub use vault::{StoreConfig, VaultClient};

/// Key/value operations the password manager needs from its backend.
///
/// `list` and `read` report a missing or forbidden key as `Ok(None)`; only a
/// failed request is an error.
pub trait SecretStore {
    /// Exchange credentials for a bearer token. `Ok(None)` means rejected.
    fn login(&self, id: &str, password: &str) -> Result<Option<String>, StoreError>;

    /// Immediate children of `prefix`; folders carry a trailing `/`.
    fn list(&self, token: &str, prefix: &str) -> Result<Option<Vec<String>>, StoreError>;

    fn read(&self, token: &str, key: &str) -> Result<Option<Record>, StoreError>;

    fn write(&self, token: &str, key: &str, record: &Record) -> Result<(), StoreError>;

    fn delete(&self, token: &str, key: &str) -> Result<(), StoreError>;
}

impl<S: SecretStore + ?Sized> SecretStore for &S {
    fn login(&self, id: &str, password: &str) -> Result<Option<String>, StoreError> {
        (**self).login(id, password)
    }

    fn list(&self, token: &str, prefix: &str) -> Result<Option<Vec<String>>, StoreError> {
        (**self).list(token, prefix)
    }

    fn read(&self, token: &str, key: &str) -> Result<Option<Record>, StoreError> {
        (**self).read(token, key)
    }

    fn write(&self, token: &str, key: &str, record: &Record) -> Result<(), StoreError> {
        (**self).write(token, key, record)
    }

    fn delete(&self, token: &str, key: &str) -> Result<(), StoreError> {
        (**self).delete(token, key)
    }
}
