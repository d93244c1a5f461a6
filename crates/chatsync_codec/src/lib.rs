//! # chatsync Codec
//!
//! CBOR encoding of stored records for the chatsync relay.
//!
//! Every record the relay persists (threads, messages, settings, change-log
//! entries) goes through this crate, so the on-store format is decided in one
//! place. Payload fields stay opaque: client-encrypted strings are stored as
//! CBOR text and arbitrary JSON settings maps as the equivalent CBOR maps.
//!
//! ## Usage
//!
//! ```
//! use chatsync_codec::{from_cbor, to_cbor};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Entry {
//!     id: String,
//!     at: i64,
//! }
//!
//! let entry = Entry { id: "m1".into(), at: 42 };
//! let bytes = to_cbor(&entry).unwrap();
//! let decoded: Entry = from_cbor(&bytes).unwrap();
//! assert_eq!(entry, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;

pub use error::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if the value cannot be serialized.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not valid CBOR or
/// do not match the shape of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    if bytes.is_empty() {
        return Err(CodecError::UnexpectedEof);
    }
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}
