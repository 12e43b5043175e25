//! Incremental update error types
//!
//! Checkpoint persistence failures propagate - a failed write must not
//! silently report success, since it would break the "no missed updates"
//! guarantee. Per-batch analysis failures are recorded in the update
//! report instead.

use thiserror::Error;

/// Errors that can occur during incremental updates
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Checkpoint file I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Match store failure while fetching a player's history
    #[error("Match store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for UpdateError {
    fn from(err: serde_json::Error) -> Self {
        UpdateError::Serialization(err.to_string())
    }
}

/// Result type alias for incremental update operations
pub type UpdateResult<T> = Result<T, UpdateError>;
