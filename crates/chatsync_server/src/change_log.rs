//! Append-only, time-bounded record of changes.

use crate::error::SyncResult;
use crate::keys;
use crate::records::RecordStore;
use chatsync_protocol::{OperationKind, ResourceKind, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One logged change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Kind of the changed resource.
    pub resource: ResourceKind,
    /// Id of the changed resource.
    pub resource_id: String,
    /// Grouping thread (messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<Uuid>,
    /// What happened.
    pub operation: OperationKind,
    /// Server time of the change.
    pub timestamp: Timestamp,
}

impl ChangeLogEntry {
    /// Creates an entry for a message change.
    pub fn message(
        thread_id: Uuid,
        message_id: impl Into<String>,
        operation: OperationKind,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            resource: ResourceKind::Message,
            resource_id: message_id.into(),
            thread_id: Some(thread_id),
            operation,
            timestamp,
        }
    }

    /// Creates an entry for a change to any other kind.
    pub fn new(
        resource: ResourceKind,
        resource_id: impl Into<String>,
        operation: OperationKind,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            resource,
            resource_id: resource_id.into(),
            thread_id: None,
            operation,
            timestamp,
        }
    }
}

/// The per-owner change log.
///
/// Entries are written once and then only expire. The key carries the
/// operation, so a create and a delete of one resource within the same
/// millisecond are both kept.
#[derive(Clone)]
pub struct ChangeLog {
    records: RecordStore,
    ttl: Duration,
}

impl ChangeLog {
    /// Creates a change log whose entries live for `ttl`.
    pub fn new(records: RecordStore, ttl: Duration) -> Self {
        Self { records, ttl }
    }

    /// Appends an entry to `owner`'s log.
    pub fn append(&self, owner: &UserId, entry: &ChangeLogEntry) -> SyncResult<()> {
        let key = keys::change(
            owner,
            entry.resource,
            &entry.resource_id,
            entry.timestamp,
            entry.operation,
        );
        self.records.put(&key, entry, Some(self.ttl))
    }

    /// Returns `owner`'s live entries strictly after `cursor`, oldest first.
    ///
    /// Within one millisecond, creates come before updates and updates
    /// before deletes.
    pub fn since(&self, owner: &UserId, cursor: Timestamp) -> SyncResult<Vec<ChangeLogEntry>> {
        let mut entries: Vec<ChangeLogEntry> = self
            .records
            .scan(&keys::change_prefix(owner))?
            .into_iter()
            .map(|(_, entry)| entry)
            .filter(|entry: &ChangeLogEntry| entry.timestamp > cursor)
            .collect();
        entries.sort_by_key(|entry| (entry.timestamp, lifecycle_rank(entry.operation)));
        Ok(entries)
    }
}

fn lifecycle_rank(operation: OperationKind) -> u8 {
    match operation {
        OperationKind::Create => 0,
        OperationKind::Update => 1,
        OperationKind::Delete => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_storage::{InMemoryStore, ManualClock};
    use std::sync::Arc;

    fn log(ttl: Duration) -> (Arc<ManualClock>, ChangeLog) {
        let clock = Arc::new(ManualClock::new(0));
        let kv = Arc::new(InMemoryStore::with_clock(clock.clone()));
        (clock, ChangeLog::new(RecordStore::new(kv), ttl))
    }

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn since_is_strict_and_sorted() {
        let (_, log) = log(Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let thread = Uuid::new_v4();

        for (id, millis) in [("b", 30), ("a", 10), ("c", 20)] {
            log.append(&owner, &ChangeLogEntry::message(thread, id, OperationKind::Create, at(millis)))
                .unwrap();
        }

        let entries = log.since(&owner, at(10)).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(entries[0].thread_id, Some(thread));
    }

    #[test]
    fn logs_are_per_owner() {
        let (_, log) = log(Duration::from_secs(60));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        log.append(&alice, &ChangeLogEntry::message(Uuid::new_v4(), "m", OperationKind::Create, at(5)))
            .unwrap();

        assert_eq!(log.since(&alice, Timestamp::ZERO).unwrap().len(), 1);
        assert!(log.since(&bob, Timestamp::ZERO).unwrap().is_empty());
    }

    #[test]
    fn entries_expire_after_retention() {
        let (clock, log) = log(Duration::from_millis(1_000));
        let owner = Uuid::new_v4();
        log.append(&owner, &ChangeLogEntry::new(ResourceKind::Thread, "t", OperationKind::Delete, at(1)))
            .unwrap();

        clock.advance(999);
        assert_eq!(log.since(&owner, Timestamp::ZERO).unwrap().len(), 1);
        clock.advance(1);
        assert!(log.since(&owner, Timestamp::ZERO).unwrap().is_empty());
    }

    #[test]
    fn same_millisecond_changes_are_all_kept() {
        let (_, log) = log(Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let thread = Uuid::new_v4();

        log.append(&owner, &ChangeLogEntry::message(thread, "m", OperationKind::Create, at(9)))
            .unwrap();
        log.append(&owner, &ChangeLogEntry::message(thread, "m", OperationKind::Delete, at(9)))
            .unwrap();
        log.append(&owner, &ChangeLogEntry::message(thread, "m", OperationKind::Update, at(9)))
            .unwrap();

        let ops: Vec<_> = log
            .since(&owner, Timestamp::ZERO)
            .unwrap()
            .into_iter()
            .map(|e| e.operation)
            .collect();
        assert_eq!(
            ops,
            vec![OperationKind::Create, OperationKind::Update, OperationKind::Delete]
        );
    }
}
