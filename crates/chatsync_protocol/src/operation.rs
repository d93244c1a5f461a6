//! Change operations returned by incremental sync.

use crate::device::DeviceId;
use crate::models::{AdvancedSettings, DisabledModels, Message, ProviderInstances, Thread};
use crate::resource::{OperationKind, ResourceKind};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// The current record attached to a non-delete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourcePayload {
    /// A thread.
    Thread(Thread),
    /// A message.
    Message(Message),
    /// Provider configurations.
    ProviderInstances(ProviderInstances),
    /// Disabled model list.
    DisabledModels(DisabledModels),
    /// Advanced settings.
    AdvancedSettings(AdvancedSettings),
}

impl ResourcePayload {
    /// Returns the kind of the carried record.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourcePayload::Thread(_) => ResourceKind::Thread,
            ResourcePayload::Message(_) => ResourceKind::Message,
            ResourcePayload::ProviderInstances(_) => ResourceKind::ProviderInstances,
            ResourcePayload::DisabledModels(_) => ResourceKind::DisabledModels,
            ResourcePayload::AdvancedSettings(_) => ResourceKind::AdvancedSettings,
        }
    }
}

/// A single change since a sync cursor.
///
/// `machine_id` is the device that authored the change, or `None` when the
/// origin could not be attributed. Clients drop operations whose
/// `machine_id` is their own (echo suppression); an unknown origin is never
/// treated as an echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeOperation {
    /// Kind of the changed resource.
    pub resource: ResourceKind,
    /// What happened.
    pub operation: OperationKind,
    /// Resource id (thread UUID, message id, or owner id for singletons).
    pub id: String,
    /// Authoring device, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<DeviceId>,
    /// Current record; absent for deletes and for records that vanished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResourcePayload>,
    /// When the change happened.
    pub timestamp: Timestamp,
}

impl ChangeOperation {
    /// Returns true if `device` authored this change.
    pub fn is_echo_of(&self, device: &DeviceId) -> bool {
        self.machine_id.as_ref() == Some(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn op(machine_id: Option<DeviceId>, data: Option<ResourcePayload>) -> ChangeOperation {
        ChangeOperation {
            resource: ResourceKind::Message,
            operation: OperationKind::Delete,
            id: "m1".into(),
            machine_id,
            data,
            timestamp: Timestamp::from_millis(5),
        }
    }

    #[test]
    fn echo_detection() {
        let me = DeviceId::generate();
        let other = DeviceId::generate();

        assert!(op(Some(me), None).is_echo_of(&me));
        assert!(!op(Some(other), None).is_echo_of(&me));
        assert!(!op(None, None).is_echo_of(&me));
    }

    #[test]
    fn delete_omits_data_and_unknown_origin() {
        let json = serde_json::to_value(op(None, None)).unwrap();
        assert_eq!(json["resource"], "message");
        assert_eq!(json["operation"], "delete");
        assert_eq!(json["timestamp"], 5);
        assert!(json.get("data").is_none());
        assert!(json.get("machine_id").is_none());
    }

    #[test]
    fn payload_kind() {
        let thread = Thread::new(Uuid::new_v4(), Uuid::new_v4(), "t", 1);
        assert_eq!(ResourcePayload::Thread(thread).kind(), ResourceKind::Thread);
    }

    #[test]
    fn thread_payload_reads_back_as_thread() {
        let thread = Thread::new(Uuid::new_v4(), Uuid::new_v4(), "enc", 7);
        let json = serde_json::to_string(&ResourcePayload::Thread(thread.clone())).unwrap();
        let decoded: ResourcePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ResourcePayload::Thread(thread));
    }
}
