//! Typed access to the key-value store.

use crate::error::SyncResult;
use chatsync_codec::{from_cbor, to_cbor};
use chatsync_storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// CBOR-encoded records over a shared [`KeyValueStore`].
///
/// The record store holds no policy of its own; it only turns typed values
/// into blobs and back. Every method is a single store call except
/// [`RecordStore::scan`], which is an enumerate followed by one read per key
/// and therefore sees no consistent snapshot.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    /// Wraps a store.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads the raw bytes under `key`.
    pub fn get_raw(&self, key: &str) -> SyncResult<Option<Vec<u8>>> {
        Ok(self.kv.get(key)?)
    }

    /// Reads and decodes the record under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SyncResult<Option<T>> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(from_cbor(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Reads a record together with the bytes it was decoded from.
    ///
    /// The bytes are what a later [`RecordStore::swap`] must expect.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> SyncResult<Option<(Vec<u8>, T)>> {
        match self.kv.get(key)? {
            Some(bytes) => {
                let record = from_cbor(&bytes)?;
                Ok(Some((bytes, record)))
            }
            None => Ok(None),
        }
    }

    /// Encodes and writes a record.
    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> SyncResult<()> {
        let bytes = to_cbor(value)?;
        self.kv.put(key, &bytes, ttl)?;
        Ok(())
    }

    /// Encodes `value` and writes it only if the stored bytes equal
    /// `expected` (`None`: only if absent).
    pub fn swap<T: Serialize>(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &T,
        ttl: Option<Duration>,
    ) -> SyncResult<bool> {
        let bytes = to_cbor(value)?;
        Ok(self.kv.compare_and_swap(key, expected, &bytes, ttl)?)
    }

    /// Removes a record; absent keys are fine.
    pub fn delete(&self, key: &str) -> SyncResult<bool> {
        Ok(self.kv.delete(key)?)
    }

    /// Reads every record under `prefix`, in key order.
    ///
    /// Keys that disappear between enumeration and read are skipped, and so
    /// are records that no longer decode; a single corrupt blob must not
    /// hide the rest of an owner's data.
    pub fn scan<T: DeserializeOwned>(&self, prefix: &str) -> SyncResult<Vec<(String, T)>> {
        let mut records = Vec::new();
        for key in self.kv.keys_with_prefix(prefix)? {
            let Some(bytes) = self.kv.get(&key)? else {
                continue;
            };
            match from_cbor(&bytes) {
                Ok(record) => records.push((key, record)),
                Err(err) => warn!(%key, error = %err, "skipping undecodable record"),
            }
        }
        Ok(records)
    }
}
