//! Request handlers for the relay's endpoints.
//!
//! Handlers are transport-agnostic: the caller's owner id comes in already
//! authenticated (or `None`), bodies come in already parsed. Every handler
//! validates completely before it mutates anything.

use crate::attribution::OriginIndex;
use crate::change_log::ChangeLog;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::messages::MessageStore;
use crate::records::RecordStore;
use crate::resolver::DeltaResolver;
use crate::versioned::{Upserted, VersionedRecord, VersionedStore};
use chatsync_protocol::{
    AdvancedSettings, ChangesSince, DeviceId, DisabledModels, Message, MessageUpdateRequest, Page,
    ProviderInstances, SettingsUpdateRequest, Thread, ThreadUpsertRequest, Timestamp, UserId,
};
use chatsync_storage::{Clock, KeyValueStore};
use std::sync::Arc;
use uuid::Uuid;

/// Context for request handling.
///
/// Every store shares one key-value backend; none of them keeps state of
/// its own between requests.
pub struct HandlerContext {
    /// Engine configuration.
    pub config: EngineConfig,
    /// Threads.
    pub threads: VersionedStore<Thread>,
    /// Provider configuration singletons.
    pub provider_instances: VersionedStore<ProviderInstances>,
    /// Disabled model singletons.
    pub disabled_models: VersionedStore<DisabledModels>,
    /// Advanced settings singletons.
    pub advanced_settings: VersionedStore<AdvancedSettings>,
    /// Messages.
    pub messages: MessageStore,
    /// Changes-since resolution.
    pub resolver: DeltaResolver,
}

impl HandlerContext {
    /// Wires every store onto `kv`.
    pub fn new(config: EngineConfig, kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let records = RecordStore::new(kv);
        let change_log = ChangeLog::new(records.clone(), config.change_log_ttl);
        let origins = OriginIndex::new(records.clone(), config.attribution_ttl);

        let threads: VersionedStore<Thread> =
            versioned_store(&config, &records, &origins, &change_log, &clock);
        let provider_instances: VersionedStore<ProviderInstances> =
            versioned_store(&config, &records, &origins, &change_log, &clock);
        let disabled_models: VersionedStore<DisabledModels> =
            versioned_store(&config, &records, &origins, &change_log, &clock);
        let advanced_settings: VersionedStore<AdvancedSettings> =
            versioned_store(&config, &records, &origins, &change_log, &clock);
        let messages = MessageStore::new(
            records,
            change_log.clone(),
            origins.clone(),
            Arc::clone(&clock),
        );

        let resolver = DeltaResolver::new(
            threads.clone(),
            provider_instances.clone(),
            disabled_models.clone(),
            advanced_settings.clone(),
            messages.clone(),
            change_log,
            origins,
            clock,
        );

        Self {
            config,
            threads,
            provider_instances,
            disabled_models,
            advanced_settings,
            messages,
            resolver,
        }
    }
}

fn versioned_store<R: VersionedRecord>(
    config: &EngineConfig,
    records: &RecordStore,
    origins: &OriginIndex,
    change_log: &ChangeLog,
    clock: &Arc<dyn Clock>,
) -> VersionedStore<R> {
    VersionedStore::new(
        records.clone(),
        origins.clone(),
        change_log.clone(),
        Arc::clone(clock),
    )
    .with_tombstones(config.record_versioned_tombstones)
    .with_max_swap_attempts(config.max_swap_attempts)
}

/// Handler for relay requests.
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Lists the caller's threads, optionally only those changed after `since`.
    pub fn list_threads(
        &self,
        caller: Option<UserId>,
        offset: Option<i64>,
        limit: Option<i64>,
        since: Option<i64>,
    ) -> SyncResult<Page<Thread>> {
        let owner = require_owner(caller)?;
        let page = self.context.config.thread_pages.resolve(offset, limit);
        let since = since.map(Timestamp::from_millis);
        self.context.threads.list_page(&owner, page, since)
    }

    /// Creates or replaces the thread at `thread_id`.
    pub fn upsert_thread(
        &self,
        caller: Option<UserId>,
        thread_id: Uuid,
        request: ThreadUpsertRequest,
    ) -> SyncResult<Upserted<Thread>> {
        let owner = require_owner(caller)?;
        check_user(&owner, &request.user_id)?;
        let device = DeviceId::parse(&request.machine_id)?;
        check_version(request.version)?;

        let mut thread = request.data;
        if thread.id.is_nil() {
            thread.id = thread_id;
        } else if thread.id != thread_id {
            return Err(SyncError::invalid(format!(
                "thread id {} does not match path id {thread_id}",
                thread.id
            )));
        }
        thread.set_owner(owner);
        thread.set_version(request.version);

        self.context.threads.upsert(thread, &device)
    }

    /// Deletes a thread. Its messages are left in place.
    pub fn delete_thread(
        &self,
        caller: Option<UserId>,
        thread_id: Uuid,
        machine_id: Option<&str>,
    ) -> SyncResult<()> {
        let owner = require_owner(caller)?;
        let device = optional_device(machine_id)?;
        self.context
            .threads
            .delete(&owner, &thread_id.to_string(), device.as_ref())
    }

    /// Lists the messages of one thread.
    pub fn list_messages(
        &self,
        caller: Option<UserId>,
        thread_id: Uuid,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> SyncResult<Page<Message>> {
        let owner = require_owner(caller)?;
        let page = self.context.config.message_pages.resolve(offset, limit);
        self.context.messages.list_page(&owner, &thread_id, page)
    }

    /// Creates a message in `thread_id`.
    pub fn create_message(
        &self,
        caller: Option<UserId>,
        thread_id: Uuid,
        machine_id: &str,
        message: Message,
    ) -> SyncResult<Message> {
        let owner = require_owner(caller)?;
        let device = DeviceId::parse(machine_id)?;
        self.context
            .messages
            .create(&owner, &thread_id, message, &device)
    }

    /// Replaces the message at `message_id`.
    pub fn update_message(
        &self,
        caller: Option<UserId>,
        message_id: &str,
        request: MessageUpdateRequest,
    ) -> SyncResult<Message> {
        let owner = require_owner(caller)?;
        check_user(&owner, &request.user_id)?;
        let device = DeviceId::parse(&request.machine_id)?;
        if message_id.is_empty() {
            return Err(SyncError::invalid("message id is required"));
        }
        if request.thread_id.is_nil() {
            return Err(SyncError::invalid("thread id is required"));
        }

        let mut message = request.data;
        if message.id.is_empty() {
            message.id = message_id.to_string();
        } else if message.id != message_id {
            return Err(SyncError::invalid(format!(
                "message id {} does not match path id {message_id}",
                message.id
            )));
        }

        self.context
            .messages
            .update(&owner, &request.thread_id, message, &device)
    }

    /// Deletes a message.
    pub fn delete_message(
        &self,
        caller: Option<UserId>,
        thread_id: Uuid,
        message_id: &str,
        machine_id: Option<&str>,
    ) -> SyncResult<()> {
        let owner = require_owner(caller)?;
        let device = optional_device(machine_id)?;
        if message_id.is_empty() {
            return Err(SyncError::invalid("message id is required"));
        }
        self.context
            .messages
            .delete(&owner, &thread_id, message_id, device.as_ref())
    }

    /// Returns the caller's provider configurations.
    pub fn get_provider_instances(&self, caller: Option<UserId>) -> SyncResult<ProviderInstances> {
        get_settings(&self.context.provider_instances, caller)
    }

    /// Replaces the caller's provider configurations.
    pub fn update_provider_instances(
        &self,
        caller: Option<UserId>,
        request: SettingsUpdateRequest<ProviderInstances>,
    ) -> SyncResult<Upserted<ProviderInstances>> {
        update_settings(&self.context.provider_instances, caller, request)
    }

    /// Returns the caller's disabled model list.
    pub fn get_disabled_models(&self, caller: Option<UserId>) -> SyncResult<DisabledModels> {
        get_settings(&self.context.disabled_models, caller)
    }

    /// Replaces the caller's disabled model list.
    pub fn update_disabled_models(
        &self,
        caller: Option<UserId>,
        request: SettingsUpdateRequest<DisabledModels>,
    ) -> SyncResult<Upserted<DisabledModels>> {
        update_settings(&self.context.disabled_models, caller, request)
    }

    /// Returns the caller's advanced settings.
    pub fn get_advanced_settings(&self, caller: Option<UserId>) -> SyncResult<AdvancedSettings> {
        get_settings(&self.context.advanced_settings, caller)
    }

    /// Replaces the caller's advanced settings.
    pub fn update_advanced_settings(
        &self,
        caller: Option<UserId>,
        request: SettingsUpdateRequest<AdvancedSettings>,
    ) -> SyncResult<Upserted<AdvancedSettings>> {
        update_settings(&self.context.advanced_settings, caller, request)
    }

    /// Returns everything that changed after `since` (Unix millis).
    ///
    /// No cursor, or a zero cursor, returns a full snapshot.
    pub fn changes_since(&self, caller: Option<UserId>, since: Option<i64>) -> SyncResult<ChangesSince> {
        let owner = require_owner(caller)?;
        if let Some(cursor) = since.filter(|cursor| *cursor < 0) {
            return Err(SyncError::invalid(format!("negative sync cursor {cursor}")));
        }
        self.context
            .resolver
            .resolve(&owner, since.map(Timestamp::from_millis))
    }
}

fn require_owner(caller: Option<UserId>) -> SyncResult<UserId> {
    caller.ok_or_else(|| SyncError::NotAuthenticated("no authenticated owner".into()))
}

fn check_user(owner: &UserId, claimed: &UserId) -> SyncResult<()> {
    if owner != claimed {
        return Err(SyncError::invalid(format!(
            "user id {claimed} does not match the authenticated owner"
        )));
    }
    Ok(())
}

fn check_version(version: i64) -> SyncResult<()> {
    if version <= 0 {
        return Err(SyncError::invalid(format!("version must be positive, got {version}")));
    }
    Ok(())
}

fn optional_device(machine_id: Option<&str>) -> SyncResult<Option<DeviceId>> {
    Ok(machine_id.map(DeviceId::parse).transpose()?)
}

fn get_settings<R: VersionedRecord>(store: &VersionedStore<R>, caller: Option<UserId>) -> SyncResult<R> {
    let owner = require_owner(caller)?;
    store.get(&owner, &owner.to_string())
}

fn update_settings<R: VersionedRecord>(
    store: &VersionedStore<R>,
    caller: Option<UserId>,
    request: SettingsUpdateRequest<R>,
) -> SyncResult<Upserted<R>> {
    let owner = require_owner(caller)?;
    check_user(&owner, &request.user_id)?;
    let device = DeviceId::parse(&request.machine_id)?;
    check_version(request.version)?;

    let mut record = request.data;
    record.set_owner(owner);
    record.set_version(request.version);
    store.upsert(record, &device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_protocol::{ResourceKind, UpsertOutcome};
    use chatsync_storage::{InMemoryStore, ManualClock};

    fn handler() -> RequestHandler {
        let clock = Arc::new(ManualClock::new(100_000));
        let kv = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let context = HandlerContext::new(EngineConfig::default(), kv, clock);
        RequestHandler::new(Arc::new(context))
    }

    fn thread_request(owner: UserId, version: i64) -> ThreadUpsertRequest {
        ThreadUpsertRequest {
            machine_id: DeviceId::generate().to_string(),
            user_id: owner,
            data: Thread::new(Uuid::nil(), owner, "enc:title", 0),
            version,
        }
    }

    #[test]
    fn requires_authenticated_owner() {
        let handler = handler();
        let err = handler.list_threads(None, None, None, None).unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated(_)));
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn upsert_thread_fills_id_and_version() {
        let handler = handler();
        let owner = Uuid::new_v4();
        let thread_id = Uuid::new_v4();

        let upserted = handler
            .upsert_thread(Some(owner), thread_id, thread_request(owner, 1000))
            .unwrap();
        assert_eq!(upserted.outcome, UpsertOutcome::Created);
        assert_eq!(upserted.record.id, thread_id);
        assert_eq!(upserted.record.version, 1000);

        let again = handler
            .upsert_thread(Some(owner), thread_id, thread_request(owner, 2000))
            .unwrap();
        assert_eq!(again.outcome, UpsertOutcome::Updated);
    }

    #[test]
    fn upsert_thread_rejects_mismatches_before_writing() {
        let handler = handler();
        let owner = Uuid::new_v4();
        let thread_id = Uuid::new_v4();

        let wrong_user = thread_request(Uuid::new_v4(), 1000);
        assert!(matches!(
            handler.upsert_thread(Some(owner), thread_id, wrong_user),
            Err(SyncError::ValidationFailed(_))
        ));

        let mut wrong_id = thread_request(owner, 1000);
        wrong_id.data.id = Uuid::new_v4();
        assert!(handler.upsert_thread(Some(owner), thread_id, wrong_id).is_err());

        let mut bad_device = thread_request(owner, 1000);
        bad_device.machine_id = Uuid::new_v4().to_string();
        assert!(matches!(
            handler.upsert_thread(Some(owner), thread_id, bad_device),
            Err(SyncError::ValidationFailed(_))
        ));

        assert!(handler.upsert_thread(Some(owner), thread_id, thread_request(owner, 0)).is_err());

        let page = handler.list_threads(Some(owner), None, None, None).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn list_threads_clamps_limit() {
        let handler = handler();
        let owner = Uuid::new_v4();
        for version in 1..=30 {
            handler
                .upsert_thread(Some(owner), Uuid::new_v4(), thread_request(owner, version))
                .unwrap();
        }

        let page = handler.list_threads(Some(owner), None, Some(100), None).unwrap();
        assert_eq!(page.limit, 28);
        assert_eq!(page.items.len(), 28);
        assert!(page.has_more);

        let default = handler.list_threads(Some(owner), Some(-5), None, None).unwrap();
        assert_eq!(default.offset, 0);
        assert_eq!(default.limit, 10);

        let recent = handler.list_threads(Some(owner), None, None, Some(25)).unwrap();
        assert_eq!(recent.total, 5);
    }

    #[test]
    fn message_lifecycle() {
        let handler = handler();
        let owner = Uuid::new_v4();
        let thread_id = Uuid::new_v4();
        let device = DeviceId::generate().to_string();

        let created = handler
            .create_message(
                Some(owner),
                thread_id,
                &device,
                Message::new("", "enc:t", "enc:user", "enc:hi"),
            )
            .unwrap();

        let mut data = created.clone();
        data.content = "enc:edited".into();
        let request = MessageUpdateRequest {
            machine_id: device.clone(),
            user_id: owner,
            thread_id,
            data,
            version: 0,
        };
        handler.update_message(Some(owner), &created.id, request).unwrap();

        let page = handler.list_messages(Some(owner), thread_id, None, None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].content, "enc:edited");
        assert_eq!(page.limit, 20);

        handler
            .delete_message(Some(owner), thread_id, &created.id, Some(&device))
            .unwrap();
        handler
            .delete_message(Some(owner), thread_id, &created.id, Some(&device))
            .unwrap();
        assert_eq!(handler.list_messages(Some(owner), thread_id, None, None).unwrap().total, 0);
    }

    #[test]
    fn update_message_rejects_id_mismatch() {
        let handler = handler();
        let owner = Uuid::new_v4();
        let request = MessageUpdateRequest {
            machine_id: DeviceId::generate().to_string(),
            user_id: owner,
            thread_id: Uuid::new_v4(),
            data: Message::new("m2", "enc:t", "enc:user", "enc:hi"),
            version: 0,
        };
        assert!(matches!(
            handler.update_message(Some(owner), "m1", request),
            Err(SyncError::ValidationFailed(_))
        ));
    }

    #[test]
    fn create_message_requires_v7_device() {
        let handler = handler();
        let result = handler.create_message(
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            "not-a-uuid",
            Message::new("", "t", "r", "c"),
        );
        assert!(matches!(result, Err(SyncError::ValidationFailed(_))));
    }

    #[test]
    fn settings_round_trip() {
        let handler = handler();
        let owner = Uuid::new_v4();

        let err = handler.get_disabled_models(Some(owner)).unwrap_err();
        assert!(matches!(err, SyncError::NotFound { kind: ResourceKind::DisabledModels, .. }));

        let mut models = std::collections::BTreeMap::new();
        models.insert("openai".to_string(), "enc:list".to_string());
        let request = SettingsUpdateRequest {
            machine_id: DeviceId::generate().to_string(),
            user_id: owner,
            data: DisabledModels {
                user_id: Uuid::nil(),
                models,
                version: 0,
                updated_at: Timestamp::ZERO,
                created_at: Timestamp::ZERO,
            },
            version: 5,
        };
        let upserted = handler.update_disabled_models(Some(owner), request.clone()).unwrap();
        assert!(upserted.outcome.is_created());
        assert_eq!(upserted.record.user_id, owner);

        let stored = handler.get_disabled_models(Some(owner)).unwrap();
        assert_eq!(stored.version, 5);
        assert_eq!(stored.updated_at, Timestamp::from_millis(100_000));

        let err = handler.update_disabled_models(Some(owner), request).unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn negative_cursor_is_rejected() {
        let handler = handler();
        let result = handler.changes_since(Some(Uuid::new_v4()), Some(-1));
        assert!(matches!(result, Err(SyncError::ValidationFailed(_))));
    }

    #[test]
    fn zero_cursor_is_snapshot() {
        let handler = handler();
        let changes = handler.changes_since(Some(Uuid::new_v4()), Some(0)).unwrap();
        assert!(changes.is_snapshot());
        assert_eq!(changes.sync_timestamp(), Timestamp::from_millis(99_999));
    }
}
