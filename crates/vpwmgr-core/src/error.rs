//! Error types shared by the core crate.

use thiserror::Error;

/// Why a group name or title was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid group name: {0:?}")]
    InvalidGroup(String),
    #[error("Group name {0:?} is reserved for archived entries")]
    ReservedGroup(String),
    #[error("Invalid title: {0:?}")]
    InvalidTitle(String),
}

/// Failures reported by a [`SecretStore`](crate::store::SecretStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response.
    #[error("request to secret store failed: {0}")]
    Transport(String),
    /// The store answered a write or delete with a non-success status.
    #[error("secret store rejected {op} of {key} with status {status}")]
    Status {
        op: &'static str,
        key: String,
        status: u16,
    },
    #[error("invalid secret store address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },
    /// The response body could not be decoded.
    #[error("malformed response from secret store: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Bad Login information")]
    AuthFailed,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Entry {0} does not exist")]
    EntryNotFound(String),

    #[error("No entry is loaded")]
    NothingLoaded,

    #[error("Entry {0} already exists; confirm to overwrite it")]
    OverwriteNotConfirmed(String),

    /// The history snapshot could not be written, so the mutation was not applied.
    #[error("Could not archive {path}; entry left unchanged: {source}")]
    ArchiveFailed {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Could not archive {0}; every nearby archive slot is taken")]
    ArchiveSlotsExhausted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
