//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is not acceptable to the store.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend returned data it could not have stored.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}
