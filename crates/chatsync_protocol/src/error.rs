//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while parsing protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The device id is not a UUID at all.
    #[error("invalid device id {value:?}: {reason}")]
    MalformedDeviceId {
        /// The rejected input.
        value: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// The device id is the nil UUID.
    #[error("device id cannot be nil")]
    NilDeviceId,

    /// The device id is a UUID of the wrong version.
    #[error("device id must be a version 7 UUID, got version {0}")]
    DeviceIdVersion(usize),

    /// Unknown resource kind tag.
    #[error("unknown resource kind: {0:?}")]
    UnknownResourceKind(String),

    /// Unknown operation tag.
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),
}
