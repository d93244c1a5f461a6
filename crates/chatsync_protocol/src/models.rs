//! Resource models.
//!
//! Every `String` field documented as *encrypted* holds client-side
//! ciphertext. The relay stores and returns it verbatim and never reads it.

use crate::timestamp::Timestamp;
use crate::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A chat thread.
///
/// `version` is the only field the relay compares. It is chosen by the
/// writing client as "now" in Unix milliseconds and plays two roles: the
/// optimistic-concurrency counter, and the public recency proxy used by
/// incremental sync (the real `updated_at` is encrypted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread identifier.
    pub id: Uuid,
    /// Owner of the thread.
    pub user_id: UserId,
    /// Encrypted title.
    pub title: String,
    /// Encrypted message count.
    #[serde(rename = "messageCount", default)]
    pub message_count: String,
    /// Encrypted date of the last message.
    #[serde(rename = "lastMessageDate", default, skip_serializing_if = "String::is_empty")]
    pub last_message_date: String,
    /// Encrypted pinned flag.
    #[serde(default)]
    pub pinned: String,
    /// Encrypted provider instance reference.
    #[serde(rename = "providerInstanceId", default)]
    pub provider_instance_id: String,
    /// Encrypted model name.
    #[serde(default)]
    pub model: String,
    /// Encrypted parent thread reference.
    #[serde(rename = "branchedFrom", default, skip_serializing_if = "String::is_empty")]
    pub branched_from: String,
    /// Encrypted web search flag.
    #[serde(rename = "webSearchEnabled", default)]
    pub web_search_enabled: String,
    /// Encrypted web search context size.
    #[serde(rename = "webSearchContextSize", default)]
    pub web_search_context_size: String,
    /// Per-thread settings with encrypted values.
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Writer-chosen monotonic version (epoch millis by convention).
    #[serde(default)]
    pub version: i64,
    /// Encrypted update time.
    #[serde(default)]
    pub updated_at: String,
    /// Encrypted creation time.
    #[serde(default)]
    pub created_at: String,
}

impl Thread {
    /// Creates a thread with empty encrypted fields.
    pub fn new(id: Uuid, user_id: UserId, title: impl Into<String>, version: i64) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            message_count: String::new(),
            last_message_date: String::new(),
            pinned: String::new(),
            provider_instance_id: String::new(),
            model: String::new(),
            branched_from: String::new(),
            web_search_enabled: String::new(),
            web_search_context_size: String::new(),
            settings: Map::new(),
            version,
            updated_at: String::new(),
            created_at: String::new(),
        }
    }

    /// Returns `version` read as the thread's recency timestamp.
    pub fn version_time(&self) -> Timestamp {
        Timestamp::from_millis(self.version)
    }
}

/// A chat message.
///
/// Everything except `id` is encrypted, including the message's own copy of
/// its thread id. The relay groups messages by the thread id supplied with
/// the request, not by this field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier; assigned by the relay when empty on create.
    #[serde(default)]
    pub id: String,
    /// Encrypted thread reference.
    #[serde(rename = "threadId")]
    pub thread_id: String,
    /// Encrypted author role.
    pub role: String,
    /// Encrypted content.
    pub content: String,
    /// Encrypted attachment ids.
    #[serde(rename = "attachmentIds", default, skip_serializing_if = "String::is_empty")]
    pub attachment_ids: String,
    /// Encrypted reasoning trace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    /// Encrypted provider instance reference.
    #[serde(rename = "providerInstanceId", default, skip_serializing_if = "String::is_empty")]
    pub provider_instance_id: String,
    /// Encrypted model name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Encrypted token usage.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage: String,
    /// Encrypted stream metrics.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metrics: String,
    /// Encrypted creation time.
    #[serde(default)]
    pub created_at: String,
    /// Encrypted update time.
    #[serde(default)]
    pub updated_at: String,
    /// Encrypted error details.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Encrypted web search flag.
    #[serde(rename = "webSearchEnabled", default, skip_serializing_if = "String::is_empty")]
    pub web_search_enabled: String,
    /// Encrypted web search context size.
    #[serde(rename = "webSearchContextSize", default, skip_serializing_if = "String::is_empty")]
    pub web_search_context_size: String,
}

impl Message {
    /// Creates a message with the required encrypted fields set.
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            role: role.into(),
            content: content.into(),
            attachment_ids: String::new(),
            reasoning: String::new(),
            provider_instance_id: String::new(),
            model: String::new(),
            usage: String::new(),
            metrics: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
            error: String::new(),
            web_search_enabled: String::new(),
            web_search_context_size: String::new(),
        }
    }
}

/// The owner's AI provider configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInstances {
    /// Owner.
    pub user_id: UserId,
    /// Provider entries with encrypted values.
    pub providers: Map<String, Value>,
    /// Writer-chosen monotonic version.
    #[serde(default)]
    pub version: i64,
    /// Server-assigned time of the last write.
    #[serde(default)]
    pub updated_at: Timestamp,
    /// Server-assigned time of the first write.
    #[serde(default)]
    pub created_at: Timestamp,
}

/// The owner's disabled model list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisabledModels {
    /// Owner.
    pub user_id: UserId,
    /// Provider instance id to encrypted model list.
    pub models: BTreeMap<String, String>,
    /// Writer-chosen monotonic version.
    #[serde(default)]
    pub version: i64,
    /// Server-assigned time of the last write.
    #[serde(default)]
    pub updated_at: Timestamp,
    /// Server-assigned time of the first write.
    #[serde(default)]
    pub created_at: Timestamp,
}

/// The owner's advanced application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedSettings {
    /// Owner.
    pub user_id: UserId,
    /// Settings with encrypted values.
    pub settings: Map<String, Value>,
    /// Writer-chosen monotonic version.
    #[serde(default)]
    pub version: i64,
    /// Server-assigned time of the last write.
    #[serde(default)]
    pub updated_at: Timestamp,
    /// Server-assigned time of the first write.
    #[serde(default)]
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_uses_client_field_names() {
        let mut thread = Thread::new(Uuid::new_v4(), Uuid::new_v4(), "enc:title", 1000);
        thread.message_count = "enc:3".into();

        let json = serde_json::to_value(&thread).unwrap();
        assert_eq!(json["messageCount"], "enc:3");
        assert_eq!(json["version"], 1000);
        assert!(json.get("branchedFrom").is_none());
    }

    #[test]
    fn thread_version_is_recency_proxy() {
        let thread = Thread::new(Uuid::new_v4(), Uuid::new_v4(), "t", 2000);
        assert_eq!(thread.version_time(), Timestamp::from_millis(2000));
    }

    #[test]
    fn message_parses_minimal_body() {
        let json = r#"{"threadId":"enc:t","role":"enc:user","content":"enc:hi"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.id.is_empty());
        assert_eq!(message.content, "enc:hi");
    }

    #[test]
    fn message_requires_content() {
        let json = r#"{"threadId":"enc:t","role":"enc:user"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn settings_timestamps_default_to_zero() {
        let json = format!(r#"{{"user_id":"{}","settings":{{}}}}"#, Uuid::new_v4());
        let settings: AdvancedSettings = serde_json::from_str(&json).unwrap();
        assert!(settings.updated_at.is_zero());
        assert_eq!(settings.version, 0);
    }
}
