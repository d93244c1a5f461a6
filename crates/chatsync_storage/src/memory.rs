//! In-memory key-value store.

use crate::backend::KeyValueStore;
use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    /// Absolute expiry in Unix millis.
    expires_at: Option<i64>,
}

impl Entry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// An in-memory key-value store.
///
/// This store keeps every entry in an ordered map and is suitable for:
/// - Unit and integration tests
/// - Single-process relays that don't need persistence
///
/// Expired entries are never returned. They are dropped when the key is
/// next written, when [`InMemoryStore::purge_expired`] runs, and by a sweep
/// that runs on the first write or prefix scan after each sweep interval
/// (one minute by default). Keys that embed a timestamp are written once
/// and never touched again, so the sweep is what keeps a long-running
/// store bounded by its live entries.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads. Each
/// operation takes the map lock once, which makes single-key operations
/// (including `compare_and_swap`) atomic.
///
/// # Example
///
/// ```rust
/// use chatsync_storage::{InMemoryStore, KeyValueStore, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new(0));
/// let store = InMemoryStore::with_clock(clock.clone());
/// store.put("k", b"v", Some(Duration::from_secs(1))).unwrap();
/// clock.advance(1_000);
/// assert_eq!(store.get("k").unwrap(), None);
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    sweep_interval: i64,
    /// Unix millis at or after which the next sweep runs.
    next_sweep: AtomicI64,
}

/// Default time between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store whose TTLs are evaluated against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
            sweep_interval: millis(DEFAULT_SWEEP_INTERVAL),
            next_sweep: AtomicI64::new(i64::MIN),
        }
    }

    /// Sets how long the store waits between sweeps of expired entries.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = millis(interval);
        self
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<i64> {
        ttl.map(|ttl| self.clock.now_millis().saturating_add(millis(ttl)))
    }

    /// Drops expired entries if the sweep interval has passed.
    ///
    /// Only the caller that advances `next_sweep` performs the sweep.
    fn sweep_if_due(&self, now: i64) {
        let due = self.next_sweep.load(Ordering::Acquire);
        if now < due {
            return;
        }
        let next = now.saturating_add(self.sweep_interval);
        if self
            .next_sweep
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.entries.write().retain(|_, entry| entry.is_live(now));
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let now = self.clock.now_millis();
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        check_key(key)?;
        self.sweep_if_due(self.clock.now_millis());
        let entry = Entry {
            value: value.to_vec(),
            expires_at: self.expiry(ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let now = self.clock.now_millis();
        let removed = self.entries.write().remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let now = self.clock.now_millis();
        self.sweep_if_due(now);
        let entries = self.entries.read();
        let keys = entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        Ok(keys)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        check_key(key)?;
        let now = self.clock.now_millis();
        self.sweep_if_due(now);
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.write();

        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.as_slice());
        if current != expected {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(true)
    }
}
