//! Resources under writer-chosen optimistic versioning.
//!
//! Threads and the three settings singletons carry a `version` chosen by
//! the writing client. A write is accepted only if its version is strictly
//! greater than the stored one, so the stored version never decreases.
//!
//! The check and the write are one compare-and-swap on the record's key: a
//! writer that loses the race re-reads and re-checks instead of overwriting
//! a newer record.

use crate::attribution::OriginIndex;
use crate::change_log::{ChangeLog, ChangeLogEntry};
use crate::error::{SyncError, SyncResult};
use crate::keys;
use crate::records::RecordStore;
use chatsync_protocol::{
    AdvancedSettings, DeviceId, DisabledModels, OperationKind, Page, PageRequest,
    ProviderInstances, ResourceKind, ResourcePayload, Thread, Timestamp, UpsertOutcome, UserId,
};
use chatsync_storage::Clock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resource kind stored by [`VersionedStore`].
pub trait VersionedRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The kind tag.
    const KIND: ResourceKind;

    /// Owner of the record.
    fn owner(&self) -> UserId;

    /// Sets the owner.
    fn set_owner(&mut self, owner: UserId);

    /// Id of the record within its kind and owner.
    fn record_id(&self) -> String;

    /// Current version.
    fn version(&self) -> i64;

    /// Sets the version.
    fn set_version(&mut self, version: i64);

    /// Time the change feed reports for the record's last change.
    fn change_time(&self) -> Timestamp;

    /// Fills server-assigned fields just before the record is written.
    fn prepare(&mut self, _now: Timestamp, _previous: Option<&Self>) {}

    /// Key the record is stored under.
    fn storage_key(owner: &UserId, id: &str) -> String;

    /// Prefix selecting every record of `owner`.
    fn listing_prefix(owner: &UserId) -> String;

    /// Wraps the record for the change feed.
    fn into_payload(self) -> ResourcePayload;
}

impl VersionedRecord for Thread {
    const KIND: ResourceKind = ResourceKind::Thread;

    fn owner(&self) -> UserId {
        self.user_id
    }

    fn set_owner(&mut self, owner: UserId) {
        self.user_id = owner;
    }

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn change_time(&self) -> Timestamp {
        self.version_time()
    }

    fn storage_key(owner: &UserId, id: &str) -> String {
        keys::thread(owner, id)
    }

    fn listing_prefix(owner: &UserId) -> String {
        keys::thread_prefix(owner)
    }

    fn into_payload(self) -> ResourcePayload {
        ResourcePayload::Thread(self)
    }
}

macro_rules! settings_record {
    ($ty:ident, $kind:expr) => {
        impl VersionedRecord for $ty {
            const KIND: ResourceKind = $kind;

            fn owner(&self) -> UserId {
                self.user_id
            }

            fn set_owner(&mut self, owner: UserId) {
                self.user_id = owner;
            }

            fn record_id(&self) -> String {
                self.user_id.to_string()
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn set_version(&mut self, version: i64) {
                self.version = version;
            }

            fn change_time(&self) -> Timestamp {
                self.updated_at
            }

            fn prepare(&mut self, now: Timestamp, previous: Option<&Self>) {
                self.updated_at = now;
                self.created_at = previous.map_or(now, |p| p.created_at);
            }

            fn storage_key(owner: &UserId, _id: &str) -> String {
                keys::settings(Self::KIND, owner)
            }

            fn listing_prefix(owner: &UserId) -> String {
                keys::settings(Self::KIND, owner)
            }

            fn into_payload(self) -> ResourcePayload {
                ResourcePayload::$ty(self)
            }
        }
    };
}

settings_record!(ProviderInstances, ResourceKind::ProviderInstances);
settings_record!(DisabledModels, ResourceKind::DisabledModels);
settings_record!(AdvancedSettings, ResourceKind::AdvancedSettings);

/// Outcome of a successful upsert, with the record as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<R> {
    /// Whether the record was created or replaced.
    pub outcome: UpsertOutcome,
    /// The stored record, including server-assigned fields.
    pub record: R,
}

/// CRUD over one versioned resource kind.
pub struct VersionedStore<R> {
    records: RecordStore,
    origins: OriginIndex,
    change_log: ChangeLog,
    clock: Arc<dyn Clock>,
    tombstones: bool,
    max_swap_attempts: u32,
    _kind: PhantomData<fn() -> R>,
}

impl<R> Clone for VersionedStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            origins: self.origins.clone(),
            change_log: self.change_log.clone(),
            clock: Arc::clone(&self.clock),
            tombstones: self.tombstones,
            max_swap_attempts: self.max_swap_attempts,
            _kind: PhantomData,
        }
    }
}

impl<R: VersionedRecord> VersionedStore<R> {
    /// Creates a store.
    pub fn new(
        records: RecordStore,
        origins: OriginIndex,
        change_log: ChangeLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            origins,
            change_log,
            clock,
            tombstones: false,
            max_swap_attempts: 16,
            _kind: PhantomData,
        }
    }

    /// Makes deletes leave a change-log tombstone.
    pub fn with_tombstones(mut self, enabled: bool) -> Self {
        self.tombstones = enabled;
        self
    }

    /// Sets how often a lost compare-and-swap is retried.
    pub fn with_max_swap_attempts(mut self, attempts: u32) -> Self {
        self.max_swap_attempts = attempts.max(1);
        self
    }

    /// Returns the record, or `NotFound`.
    pub fn get(&self, owner: &UserId, id: &str) -> SyncResult<R> {
        self.find(owner, id)?
            .ok_or_else(|| SyncError::not_found(R::KIND, id))
    }

    /// Returns the record if it exists.
    pub fn find(&self, owner: &UserId, id: &str) -> SyncResult<Option<R>> {
        self.records.get(&R::storage_key(owner, id))
    }

    /// Returns the owner's singleton record if it was ever written.
    pub fn singleton(&self, owner: &UserId) -> SyncResult<Option<R>> {
        self.find(owner, &owner.to_string())
    }

    /// Lists the owner's records, ordered by id.
    ///
    /// With `since`, only records whose change time is strictly after it.
    pub fn list(&self, owner: &UserId, since: Option<Timestamp>) -> SyncResult<Vec<R>> {
        let mut items: Vec<R> = self
            .records
            .scan(&R::listing_prefix(owner))?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record: &R| since.map_or(true, |since| record.change_time() > since))
            .collect();
        items.sort_by_key(|record| record.record_id());
        Ok(items)
    }

    /// Returns one page of [`VersionedStore::list`].
    pub fn list_page(
        &self,
        owner: &UserId,
        page: PageRequest,
        since: Option<Timestamp>,
    ) -> SyncResult<Page<R>> {
        Ok(Page::from_items(self.list(owner, since)?, page))
    }

    /// Creates or replaces a record.
    ///
    /// A replacement must carry a version strictly greater than the stored
    /// one, otherwise the store is left untouched and `VersionConflict` is
    /// returned. On success `device` is recorded as the origin of the
    /// change; failing to record it is logged, not returned.
    pub fn upsert(&self, record: R, device: &DeviceId) -> SyncResult<Upserted<R>> {
        let owner = record.owner();
        let id = record.record_id();
        let key = R::storage_key(&owner, &id);

        for attempt in 1..=self.max_swap_attempts {
            let current = self.records.read::<R>(&key)?;

            if let Some((_, stored)) = &current {
                if record.version() <= stored.version() {
                    return Err(SyncError::VersionConflict {
                        kind: R::KIND,
                        id,
                        stored: stored.version(),
                        attempted: record.version(),
                    });
                }
            }

            let now = Timestamp::from_millis(self.clock.now_millis());
            let mut next = record.clone();
            next.prepare(now, current.as_ref().map(|(_, stored)| stored));

            let expected = current.as_ref().map(|(bytes, _)| bytes.as_slice());
            if self.records.swap(&key, expected, &next, None)? {
                let outcome = if current.is_some() {
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Created
                };
                debug!(kind = %R::KIND, %id, version = next.version(), ?outcome, "upserted");

                if let Err(err) = self.origins.record(&owner, R::KIND, &id, next.change_time(), device) {
                    warn!(kind = %R::KIND, %id, error = %err, "failed to record origin");
                }
                return Ok(Upserted {
                    outcome,
                    record: next,
                });
            }

            debug!(kind = %R::KIND, %id, attempt, "lost compare-and-swap, retrying");
        }

        Err(SyncError::Internal(format!(
            "{} {id}: gave up after {} contended writes",
            R::KIND,
            self.max_swap_attempts
        )))
    }

    /// Deletes a record. Deleting an absent record succeeds.
    ///
    /// No version is checked. With tombstones enabled, the deletion of an
    /// existing record is appended to the change log (attributed to
    /// `device` when given) before the record is removed.
    pub fn delete(&self, owner: &UserId, id: &str, device: Option<&DeviceId>) -> SyncResult<()> {
        let key = R::storage_key(owner, id);
        if self.tombstones && self.records.get_raw(&key)?.is_some() {
            let now = Timestamp::from_millis(self.clock.now_millis());
            let entry = ChangeLogEntry::new(R::KIND, id, OperationKind::Delete, now);
            if let Err(err) = self.change_log.append(owner, &entry) {
                warn!(kind = %R::KIND, %id, error = %err, "failed to log deletion");
            }
            if let Some(device) = device {
                if let Err(err) = self.origins.record(owner, R::KIND, id, now, device) {
                    warn!(kind = %R::KIND, %id, error = %err, "failed to record origin");
                }
            }
        }

        let existed = self.records.delete(&key)?;
        debug!(kind = %R::KIND, %id, existed, "deleted");
        Ok(())
    }
}
