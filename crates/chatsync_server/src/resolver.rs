//! Answers "what changed since T".

use crate::attribution::OriginIndex;
use crate::change_log::{ChangeLog, ChangeLogEntry};
use crate::error::SyncResult;
use crate::messages::MessageStore;
use crate::versioned::{VersionedRecord, VersionedStore};
use chatsync_protocol::{
    AdvancedSettings, ChangeOperation, ChangesSince, Delta, DisabledModels, OperationKind,
    ProviderInstances, ResourceKind, ResourcePayload, Snapshot, Thread, Timestamp, UserId,
};
use chatsync_storage::Clock;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a changes-since request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Return complete state.
    FullSync,
    /// Return operations after the cursor.
    IncrementalSync(Timestamp),
}

impl SyncMode {
    /// An absent or zero cursor asks for a full sync.
    pub fn from_cursor(cursor: Option<Timestamp>) -> Self {
        match cursor {
            Some(cursor) if !cursor.is_zero() => SyncMode::IncrementalSync(cursor),
            _ => SyncMode::FullSync,
        }
    }
}

/// Assembles snapshots and deltas from the resource stores.
///
/// Holds no state between requests. Threads and settings are found through
/// their change time; messages only through the change log.
#[derive(Clone)]
pub struct DeltaResolver {
    threads: VersionedStore<Thread>,
    provider_instances: VersionedStore<ProviderInstances>,
    disabled_models: VersionedStore<DisabledModels>,
    advanced_settings: VersionedStore<AdvancedSettings>,
    messages: MessageStore,
    change_log: ChangeLog,
    origins: OriginIndex,
    clock: Arc<dyn Clock>,
}

impl DeltaResolver {
    /// Creates a resolver over the given stores.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        threads: VersionedStore<Thread>,
        provider_instances: VersionedStore<ProviderInstances>,
        disabled_models: VersionedStore<DisabledModels>,
        advanced_settings: VersionedStore<AdvancedSettings>,
        messages: MessageStore,
        change_log: ChangeLog,
        origins: OriginIndex,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            threads,
            provider_instances,
            disabled_models,
            advanced_settings,
            messages,
            change_log,
            origins,
            clock,
        }
    }

    /// Answers a changes-since request for `owner`.
    ///
    /// The returned `sync_timestamp` is one millisecond before the request
    /// started. Cursors are exclusive, so anything written from the start
    /// of the request on, including later in that same millisecond, is
    /// after it and gets reported next time. Changes this response already
    /// carried may be reported twice.
    pub fn resolve(&self, owner: &UserId, cursor: Option<Timestamp>) -> SyncResult<ChangesSince> {
        let sync_timestamp = Timestamp::from_millis(self.clock.now_millis().saturating_sub(1));
        match SyncMode::from_cursor(cursor) {
            SyncMode::FullSync => self.snapshot(owner, sync_timestamp).map(ChangesSince::Snapshot),
            SyncMode::IncrementalSync(cursor) => self
                .delta(owner, cursor, sync_timestamp)
                .map(ChangesSince::Delta),
        }
    }

    fn snapshot(&self, owner: &UserId, sync_timestamp: Timestamp) -> SyncResult<Snapshot> {
        let threads = self.threads.list(owner, None)?;
        let mut messages = Vec::new();
        for thread in &threads {
            messages.extend(self.messages.list(owner, &thread.id)?);
        }
        debug!(%owner, threads = threads.len(), messages = messages.len(), "full sync");

        Ok(Snapshot {
            threads,
            messages,
            provider_instances: self.provider_instances.singleton(owner)?,
            disabled_models: self.disabled_models.singleton(owner)?,
            advanced_settings: self.advanced_settings.singleton(owner)?,
            sync_timestamp,
        })
    }

    fn delta(&self, owner: &UserId, cursor: Timestamp, sync_timestamp: Timestamp) -> SyncResult<Delta> {
        let mut operations = Vec::new();

        for thread in self.threads.list(owner, Some(cursor))? {
            operations.push(self.update_operation(owner, thread));
        }
        self.push_singleton(&mut operations, owner, self.provider_instances.singleton(owner)?, cursor);
        self.push_singleton(&mut operations, owner, self.disabled_models.singleton(owner)?, cursor);
        self.push_singleton(&mut operations, owner, self.advanced_settings.singleton(owner)?, cursor);

        for entry in self.change_log.since(owner, cursor)? {
            operations.push(self.logged_operation(owner, entry));
        }

        debug!(%owner, %cursor, operations = operations.len(), "incremental sync");
        Ok(Delta {
            operations,
            sync_timestamp,
        })
    }

    fn push_singleton<R: VersionedRecord>(
        &self,
        operations: &mut Vec<ChangeOperation>,
        owner: &UserId,
        record: Option<R>,
        cursor: Timestamp,
    ) {
        if let Some(record) = record.filter(|r| r.change_time() > cursor) {
            operations.push(self.update_operation(owner, record));
        }
    }

    fn update_operation<R: VersionedRecord>(&self, owner: &UserId, record: R) -> ChangeOperation {
        let id = record.record_id();
        let timestamp = record.change_time();
        ChangeOperation {
            resource: R::KIND,
            operation: OperationKind::Update,
            machine_id: self.origins.lookup(owner, R::KIND, &id, timestamp),
            id,
            data: Some(record.into_payload()),
            timestamp,
        }
    }

    fn logged_operation(&self, owner: &UserId, entry: ChangeLogEntry) -> ChangeOperation {
        let data = if entry.operation.carries_payload() {
            self.current_payload(owner, &entry)
        } else {
            None
        };
        ChangeOperation {
            resource: entry.resource,
            operation: entry.operation,
            machine_id: self
                .origins
                .lookup(owner, entry.resource, &entry.resource_id, entry.timestamp),
            id: entry.resource_id,
            data,
            timestamp: entry.timestamp,
        }
    }

    /// Fetches the record a logged change refers to.
    ///
    /// A record that has since disappeared, or cannot be read, yields an
    /// operation without data.
    fn current_payload(&self, owner: &UserId, entry: &ChangeLogEntry) -> Option<ResourcePayload> {
        let id = entry.resource_id.as_str();
        let found = match entry.resource {
            ResourceKind::Message => match entry.thread_id {
                Some(thread_id) => self
                    .messages
                    .find(owner, &thread_id, id)
                    .map(|m| m.map(ResourcePayload::Message)),
                None => Ok(None),
            },
            ResourceKind::Thread => self.threads.find(owner, id).map(|r| r.map(Thread::into_payload)),
            ResourceKind::ProviderInstances => self
                .provider_instances
                .singleton(owner)
                .map(|r| r.map(ProviderInstances::into_payload)),
            ResourceKind::DisabledModels => self
                .disabled_models
                .singleton(owner)
                .map(|r| r.map(DisabledModels::into_payload)),
            ResourceKind::AdvancedSettings => self
                .advanced_settings
                .singleton(owner)
                .map(|r| r.map(AdvancedSettings::into_payload)),
        };
        match found {
            Ok(payload) => payload,
            Err(err) => {
                warn!(kind = %entry.resource, id, error = %err, "payload fetch failed");
                None
            }
        }
    }
}
