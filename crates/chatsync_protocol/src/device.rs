//! Device identity.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of the device that authored a change.
///
/// Device ids must be version 7 UUIDs: unique, and roughly ordered by the
/// time the device was set up. Construction always validates, so holding a
/// `DeviceId` proves the id is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Validates an existing UUID.
    ///
    /// # Errors
    ///
    /// Returns an error if the UUID is nil or not version 7.
    pub fn new(uuid: Uuid) -> ProtocolResult<Self> {
        if uuid.is_nil() {
            return Err(ProtocolError::NilDeviceId);
        }
        match uuid.get_version_num() {
            7 => Ok(Self(uuid)),
            other => Err(ProtocolError::DeviceIdVersion(other)),
        }
    }

    /// Parses and validates a textual device id.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a UUID, or is not a valid
    /// device UUID per [`DeviceId::new`].
    pub fn parse(value: &str) -> ProtocolResult<Self> {
        let uuid = Uuid::parse_str(value).map_err(|e| ProtocolError::MalformedDeviceId {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(uuid)
    }

    /// Generates a fresh device id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DeviceId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_v7() {
        let uuid = Uuid::now_v7();
        let id = DeviceId::parse(&uuid.to_string()).unwrap();
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn rejects_v4() {
        let err = DeviceId::parse(&Uuid::new_v4().to_string()).unwrap_err();
        assert_eq!(err, ProtocolError::DeviceIdVersion(4));
    }

    #[test]
    fn rejects_nil() {
        assert_eq!(
            DeviceId::new(Uuid::nil()).unwrap_err(),
            ProtocolError::NilDeviceId
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            DeviceId::parse("laptop"),
            Err(ProtocolError::MalformedDeviceId { .. })
        ));
    }

    #[test]
    fn serde_validates() {
        let id = DeviceId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<DeviceId>(&json).unwrap(), id);

        let v4 = format!("\"{}\"", Uuid::new_v4());
        assert!(serde_json::from_str::<DeviceId>(&v4).is_err());
    }
}
