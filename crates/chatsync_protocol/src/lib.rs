//! # chatsync Protocol
//!
//! Sync protocol types for the chatsync relay.
//!
//! This crate provides:
//! - Resource models (`Thread`, `Message`, the three settings singletons)
//! - `ResourceKind` / `OperationKind` tags and millisecond `Timestamp`s
//! - `DeviceId`, the UUIDv7 identity every write is attributed to
//! - `ChangeOperation`, the unit of an incremental sync
//! - Request and response shapes (`ChangesSince`, `Page`, update requests)
//!
//! All content fields are opaque client-encrypted strings; the only fields
//! the relay ever reads are identifiers, `version` and server timestamps.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod device;
mod error;
mod messages;
mod models;
mod operation;
mod resource;
mod timestamp;

pub use device::DeviceId;
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    ChangesSince, Delta, MessageUpdateRequest, Page, PageLimits, PageRequest,
    SettingsUpdateRequest, Snapshot, ThreadUpsertRequest, UpsertOutcome,
};
pub use models::{AdvancedSettings, DisabledModels, Message, ProviderInstances, Thread};
pub use operation::{ChangeOperation, ResourcePayload};
pub use resource::{OperationKind, ResourceKind};
pub use timestamp::Timestamp;

/// Identifier of the authenticated owner of every resource.
pub type UserId = uuid::Uuid;
