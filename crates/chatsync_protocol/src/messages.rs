//! Request and response shapes.

use crate::device::DeviceId;
use crate::models::{AdvancedSettings, DisabledModels, Message, ProviderInstances, Thread};
use crate::operation::ChangeOperation;
use crate::timestamp::Timestamp;
use crate::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a thread upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadUpsertRequest {
    /// Authoring device, validated as a UUIDv7 by the relay.
    pub machine_id: String,
    /// Owner the client believes it is writing for.
    pub user_id: UserId,
    /// The thread. Its `id` may be nil, in which case the path id is used.
    pub data: Thread,
    /// New version; overrides `data.version`.
    pub version: i64,
}

/// Body of a message update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdateRequest {
    /// Authoring device, validated as a UUIDv7 by the relay.
    pub machine_id: String,
    /// Owner the client believes it is writing for.
    pub user_id: UserId,
    /// Thread that groups the message.
    pub thread_id: Uuid,
    /// The message.
    pub data: Message,
    /// Client version; messages are not version-checked.
    #[serde(default)]
    pub version: i64,
}

/// Body of a settings singleton update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdateRequest<T> {
    /// Authoring device, validated as a UUIDv7 by the relay.
    pub machine_id: String,
    /// Owner the client believes it is writing for.
    pub user_id: UserId,
    /// The settings record.
    pub data: T,
    /// New version; overrides the record's own version.
    pub version: i64,
}

/// Result of a successful upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// No record existed before.
    Created,
    /// An existing record was replaced.
    Updated,
}

impl UpsertOutcome {
    /// Returns true if the upsert created the record.
    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created)
    }
}

/// Default and maximum page sizes for one listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Page size used when the caller gives none (or a non-positive one).
    pub default_limit: usize,
    /// Largest page size the relay will serve.
    pub max_limit: usize,
}

impl PageLimits {
    /// Creates page limits.
    pub const fn new(default_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Turns raw query values into a bounded page request.
    ///
    /// Negative offsets become 0, missing or non-positive limits become the
    /// default, and limits above the maximum are clamped to it.
    pub fn resolve(&self, offset: Option<i64>, limit: Option<i64>) -> PageRequest {
        let offset = offset
            .and_then(|o| usize::try_from(o).ok())
            .unwrap_or(0);
        let limit = match limit.and_then(|l| usize::try_from(l).ok()) {
            Some(l) if l > 0 => l.min(self.max_limit),
            _ => self.default_limit.min(self.max_limit),
        };
        PageRequest { offset, limit }
    }
}

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to skip.
    pub offset: usize,
    /// Maximum number of items to return.
    pub limit: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Number of items across all pages.
    pub total: usize,
    /// Offset this page starts at.
    pub offset: usize,
    /// Page size that was applied.
    pub limit: usize,
    /// True iff `offset + limit < total`.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Cuts the `request` window out of the complete, ordered item list.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let end = request.offset.saturating_add(request.limit);
        let page = items
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        Self {
            items: page,
            total,
            offset: request.offset,
            limit: request.limit,
            has_more: end < total,
        }
    }
}

/// Complete state of an owner, returned when no cursor is supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every thread.
    pub threads: Vec<Thread>,
    /// Every message of those threads.
    pub messages: Vec<Message>,
    /// Provider configurations, if ever written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_instances: Option<ProviderInstances>,
    /// Disabled model list, if ever written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_models: Option<DisabledModels>,
    /// Advanced settings, if ever written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_settings: Option<AdvancedSettings>,
    /// Cursor for the next incremental sync.
    pub sync_timestamp: Timestamp,
}

/// Changes since a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Operations, each strictly after the cursor. No cross-kind ordering.
    pub operations: Vec<ChangeOperation>,
    /// Cursor for the next incremental sync.
    pub sync_timestamp: Timestamp,
}

impl Delta {
    /// Drops every operation authored by `device`.
    pub fn without_echoes(mut self, device: &DeviceId) -> Self {
        self.operations.retain(|op| !op.is_echo_of(device));
        self
    }
}

/// Response to a changes-since query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangesSince {
    /// Full sync.
    Snapshot(Snapshot),
    /// Incremental sync.
    Delta(Delta),
}

impl ChangesSince {
    /// Returns the cursor the client should send next time.
    pub fn sync_timestamp(&self) -> Timestamp {
        match self {
            ChangesSince::Snapshot(snapshot) => snapshot.sync_timestamp,
            ChangesSince::Delta(delta) => delta.sync_timestamp,
        }
    }

    /// Returns true for a full sync.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, ChangesSince::Snapshot(_))
    }

    /// Returns the operations of an incremental sync; empty for a snapshot.
    pub fn operations(&self) -> &[ChangeOperation] {
        match self {
            ChangesSince::Snapshot(_) => &[],
            ChangesSince::Delta(delta) => &delta.operations,
        }
    }
}
