//! Error types for the sync engine.

use chatsync_codec::CodecError;
use chatsync_protocol::{ProtocolError, ResourceKind};
use chatsync_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No authenticated owner accompanies the request.
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// The resource does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Id of the missing resource.
        id: String,
    },

    /// The request is malformed.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The optimistic version check failed.
    #[error("version conflict on {kind} {id}: stored version {stored}, attempted {attempted}")]
    VersionConflict {
        /// Kind of the contested resource.
        kind: ResourceKind,
        /// Id of the contested resource.
        id: String,
        /// Version currently stored.
        stored: i64,
        /// Version the writer supplied.
        attempted: i64,
    },

    /// Store unavailable, corrupt record, or any other server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Creates a not-found error.
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates a validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, SyncError::Internal(_))
    }

    /// Returns the HTTP status code a transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::NotAuthenticated(_) => 401,
            SyncError::NotFound { .. } => 404,
            SyncError::ValidationFailed(_) => 400,
            SyncError::VersionConflict { .. } => 409,
            SyncError::Internal(_) => 500,
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::Internal(format!("storage: {err}"))
    }
}

impl From<CodecError> for SyncError {
    fn from(err: CodecError) -> Self {
        SyncError::Internal(format!("codec: {err}"))
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::ValidationFailed(err.to_string())
    }
}
