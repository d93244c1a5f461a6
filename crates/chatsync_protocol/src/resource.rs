//! Resource and operation tags.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a synchronizable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A chat thread, versioned per item.
    Thread,
    /// A chat message, change-logged.
    Message,
    /// Provider configuration singleton.
    ProviderInstances,
    /// Disabled model list singleton.
    DisabledModels,
    /// Advanced settings singleton.
    AdvancedSettings,
}

impl ResourceKind {
    /// Every kind, in the order they appear in a sync response.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Thread,
        ResourceKind::Message,
        ResourceKind::ProviderInstances,
        ResourceKind::DisabledModels,
        ResourceKind::AdvancedSettings,
    ];

    /// Returns the wire tag of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Thread => "thread",
            ResourceKind::Message => "message",
            ResourceKind::ProviderInstances => "provider_instances",
            ResourceKind::DisabledModels => "disabled_models",
            ResourceKind::AdvancedSettings => "advanced_settings",
        }
    }

    /// Returns true for kinds stored once per owner.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            ResourceKind::ProviderInstances
                | ResourceKind::DisabledModels
                | ResourceKind::AdvancedSettings
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownResourceKind(s.to_string()))
    }
}

/// Type of change recorded for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Resource was created.
    Create,
    /// Resource was replaced.
    Update,
    /// Resource was removed.
    Delete,
}

impl OperationKind {
    /// Returns the wire tag of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    /// Returns true if the operation leaves a record behind.
    pub fn carries_payload(&self) -> bool {
        !matches!(self, OperationKind::Delete)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}
