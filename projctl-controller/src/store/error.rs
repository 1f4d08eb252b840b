//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create of a key that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Version token is stale (optimistic concurrency control).
    #[error("conflict: {key} was modified, expected version {expected}, current {current}")]
    Conflict {
        key: String,
        expected: String,
        current: String,
    },

    /// Document rejected by the store.
    #[error("invalid document: {0}")]
    Invalid(String),

    /// Store could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
