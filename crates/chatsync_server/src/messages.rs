//! Messages: records whose every mutable field is opaque.
//!
//! Nothing in a stored message tells the relay when it changed, so every
//! mutation is also appended to the change log, and that log is the only
//! way incremental sync learns about messages.

use crate::attribution::OriginIndex;
use crate::change_log::{ChangeLog, ChangeLogEntry};
use crate::error::{SyncError, SyncResult};
use crate::keys;
use crate::records::RecordStore;
use chatsync_protocol::{
    DeviceId, Message, OperationKind, Page, PageRequest, ResourceKind, Timestamp, UserId,
};
use chatsync_storage::Clock;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// CRUD over messages, grouped by owner and thread.
#[derive(Clone)]
pub struct MessageStore {
    records: RecordStore,
    change_log: ChangeLog,
    origins: OriginIndex,
    clock: Arc<dyn Clock>,
}

impl MessageStore {
    /// Creates a message store.
    pub fn new(
        records: RecordStore,
        change_log: ChangeLog,
        origins: OriginIndex,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            change_log,
            origins,
            clock,
        }
    }

    /// Returns a message, or `NotFound`.
    pub fn get(&self, owner: &UserId, thread_id: &Uuid, message_id: &str) -> SyncResult<Message> {
        self.find(owner, thread_id, message_id)?
            .ok_or_else(|| SyncError::not_found(ResourceKind::Message, message_id))
    }

    /// Returns a message if it exists.
    pub fn find(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        message_id: &str,
    ) -> SyncResult<Option<Message>> {
        self.records.get(&keys::message(owner, thread_id, message_id))
    }

    /// Lists a thread's messages, ordered by id.
    pub fn list(&self, owner: &UserId, thread_id: &Uuid) -> SyncResult<Vec<Message>> {
        Ok(self
            .records
            .scan(&keys::message_prefix(owner, thread_id))?
            .into_iter()
            .map(|(_, message)| message)
            .collect())
    }

    /// Returns one page of [`MessageStore::list`].
    pub fn list_page(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        page: PageRequest,
    ) -> SyncResult<Page<Message>> {
        Ok(Page::from_items(self.list(owner, thread_id)?, page))
    }

    /// Stores a new message, assigning a random id when it has none.
    ///
    /// An existing message with the same id is replaced.
    pub fn create(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        mut message: Message,
        device: &DeviceId,
    ) -> SyncResult<Message> {
        if message.id.is_empty() {
            message.id = Uuid::new_v4().to_string();
        }
        self.records
            .put(&keys::message(owner, thread_id, &message.id), &message, None)?;
        self.record_change(owner, thread_id, &message.id, OperationKind::Create, Some(device));
        Ok(message)
    }

    /// Stores a message unconditionally.
    ///
    /// Message contents are opaque, so concurrent updates cannot be
    /// detected; the last writer wins.
    pub fn update(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        message: Message,
        device: &DeviceId,
    ) -> SyncResult<Message> {
        if message.id.is_empty() {
            return Err(SyncError::invalid("message id is required"));
        }
        self.records
            .put(&keys::message(owner, thread_id, &message.id), &message, None)?;
        self.record_change(owner, thread_id, &message.id, OperationKind::Update, Some(device));
        Ok(message)
    }

    /// Deletes a message. Deleting an absent message succeeds.
    ///
    /// The deletion is logged before the record is removed, so a crash in
    /// between leaves a delete for a record that still exists rather than a
    /// record that vanished without trace.
    pub fn delete(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        message_id: &str,
        device: Option<&DeviceId>,
    ) -> SyncResult<()> {
        let key = keys::message(owner, thread_id, message_id);
        if self.records.get_raw(&key)?.is_none() {
            debug!(%thread_id, message_id, "message already absent");
            return Ok(());
        }
        self.record_change(owner, thread_id, message_id, OperationKind::Delete, device);
        self.records.delete(&key)?;
        Ok(())
    }

    /// Appends the change and its origin under one server timestamp.
    ///
    /// Both writes are best-effort: the message write already succeeded.
    fn record_change(
        &self,
        owner: &UserId,
        thread_id: &Uuid,
        message_id: &str,
        operation: OperationKind,
        device: Option<&DeviceId>,
    ) {
        let now = Timestamp::from_millis(self.clock.now_millis());
        let entry = ChangeLogEntry::message(*thread_id, message_id, operation, now);
        if let Err(err) = self.change_log.append(owner, &entry) {
            warn!(%thread_id, message_id, %operation, error = %err, "failed to log message change");
        }
        if let Some(device) = device {
            if let Err(err) = self.origins.record(owner, ResourceKind::Message, message_id, now, device) {
                warn!(%thread_id, message_id, error = %err, "failed to record origin");
            }
        }
        debug!(%thread_id, message_id, %operation, at = %now, "message changed");
    }
}
