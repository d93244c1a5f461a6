//! # chatsync Storage
//!
//! Key-value store trait and backends for the chatsync relay.
//!
//! This crate provides the lowest-level storage abstraction of the relay.
//! Stores are **opaque blob stores** keyed by strings - they do not interpret
//! the values they hold.
//!
//! ## Design Principles
//!
//! - Single-key operations are atomic; there are no multi-key transactions
//! - Entries may carry a time-to-live; expired entries are invisible
//! - `compare_and_swap` is the only conditional write primitive
//! - Must be `Send + Sync`, one store is shared by every request
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and single-process deployments
//!
//! ## Example
//!
//! ```rust
//! use chatsync_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.put("threads:a:1", b"blob", None).unwrap();
//! assert_eq!(store.get("threads:a:1").unwrap(), Some(b"blob".to_vec()));
//! assert_eq!(store.keys_with_prefix("threads:a:").unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backend;
mod clock;
mod error;
mod memory;

pub use backend::KeyValueStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryStore, DEFAULT_SWEEP_INTERVAL};
