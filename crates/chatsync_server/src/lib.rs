//! # chatsync Server
//!
//! Sync engine for end-to-end encrypted chat data.
//!
//! Devices keep local copies of a user's threads, messages and settings,
//! and converge through this relay. The relay never sees plaintext: it
//! stores opaque records and reads only identifiers, versions and its own
//! timestamps.
//!
//! This crate provides:
//! - Optimistically versioned threads and settings (`VersionedStore`)
//! - Messages with change visibility through the change log (`MessageStore`)
//! - Attribution of every change to its authoring device (`OriginIndex`)
//! - Full and incremental changes-since resolution (`DeltaResolver`)
//! - A transport-agnostic request surface (`RequestHandler`, `SyncServer`)
//! - HMAC-SHA256 bearer tokens (`TokenAuthenticator`)
//!
//! # Sync
//!
//! A client with no cursor (or cursor 0) gets a complete snapshot and a
//! `sync_timestamp`. Afterwards it sends that timestamp back and receives
//! only the operations after it:
//!
//! - threads whose `version` is after the cursor
//! - settings whose server `updated_at` is after the cursor
//! - logged message changes (and thread deletions, if enabled)
//!
//! Each operation names the device that made it, so a client can drop its
//! own echoes with `Delta::without_echoes`.
//!
//! # Consistency
//!
//! The record write is authoritative. Change-log and attribution writes
//! that follow it are best-effort: their failures are logged with
//! `tracing` and never undo or fail the request.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod attribution;
mod auth;
mod change_log;
mod config;
mod error;
mod handler;
mod keys;
mod messages;
mod records;
mod resolver;
mod server;
mod versioned;

pub use attribution::OriginIndex;
pub use auth::{AuthConfig, Authenticator, TokenAuthenticator};
pub use change_log::{ChangeLog, ChangeLogEntry};
pub use config::{EngineConfig, DEFAULT_RETENTION};
pub use error::{SyncError, SyncResult};
pub use handler::{HandlerContext, RequestHandler};
pub use messages::MessageStore;
pub use records::RecordStore;
pub use resolver::{DeltaResolver, SyncMode};
pub use server::SyncServer;
pub use versioned::{Upserted, VersionedRecord, VersionedStore};
