//! Origin attribution: which device authored a change.

use crate::error::SyncResult;
use crate::keys;
use crate::records::RecordStore;
use chatsync_protocol::{DeviceId, ResourceKind, Timestamp, UserId};
use std::time::Duration;
use tracing::warn;

/// Maps `(owner, kind, id, change time)` to the device that made the change.
///
/// Lookups are exact: the timestamp a change is recorded under must be the
/// one the change feed reports for it. Threads use their `version`,
/// singletons their `updated_at`, messages the change-log timestamp.
/// Resource ids are only unique per owner, so every entry is keyed by owner.
#[derive(Clone)]
pub struct OriginIndex {
    records: RecordStore,
    ttl: Option<Duration>,
}

impl OriginIndex {
    /// Creates an index whose entries live for `ttl` (`None`: forever).
    pub fn new(records: RecordStore, ttl: Option<Duration>) -> Self {
        Self { records, ttl }
    }

    /// Records `device` as the origin of a change to one of `owner`'s resources.
    pub fn record(
        &self,
        owner: &UserId,
        kind: ResourceKind,
        id: &str,
        at: Timestamp,
        device: &DeviceId,
    ) -> SyncResult<()> {
        self.records
            .put(&keys::origin(owner, kind, id, at), device, self.ttl)
    }

    /// Returns the origin of a change, if known.
    ///
    /// A failed read is logged and reported as an unknown origin.
    pub fn lookup(
        &self,
        owner: &UserId,
        kind: ResourceKind,
        id: &str,
        at: Timestamp,
    ) -> Option<DeviceId> {
        match self.records.get(&keys::origin(owner, kind, id, at)) {
            Ok(device) => device,
            Err(err) => {
                warn!(%kind, id, %at, error = %err, "origin lookup failed");
                None
            }
        }
    }
}
