//! Key-value store trait definition.

use crate::error::StorageResult;
use std::sync::Arc;
use std::time::Duration;

/// A key-value store shared by every request of the relay.
///
/// Stores are **opaque blob stores**. Keys are UTF-8 strings whose prefix
/// structure is owned by the caller; values are never interpreted.
///
/// # Invariants
///
/// - Every single-key operation is atomic with respect to other operations
///   on the same key
/// - Nothing is atomic across keys
/// - An entry whose TTL has elapsed behaves exactly as if it were absent
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and single-process deployments
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any existing value.
    ///
    /// With `ttl = Some(d)` the entry expires `d` after the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the store is unavailable.
    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()>;

    /// Removes `key`.
    ///
    /// Returns whether a live entry was removed. Removing an absent key is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Enumerates every live key starting with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Atomically replaces the value under `key` if it currently equals
    /// `expected`.
    ///
    /// `expected = None` means the key must be absent (or expired). Returns
    /// `true` if the write happened, `false` if the current value differed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the store is unavailable.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        (**self).put(key, value, ttl)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        (**self).compare_and_swap(key, expected, value, ttl)
    }
}
