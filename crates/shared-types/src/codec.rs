//! # Record Codec
//!
//! Typed records on top of the byte store. Values are bincode-encoded;
//! keys are `/`-joined ASCII segments under a module prefix, with numeric
//! segments zero-padded so lexicographic order equals numeric order.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ChainId, KeyValueStore, StoreError};

/// Builder for module-scoped store keys.
///
/// ```
/// use shared_types::StoreKey;
/// let key = StoreKey::new("nonce").chain(97).height(3).build();
/// assert_eq!(key, b"nonce/00000000000000000097/00000000000000000003".to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct StoreKey(String);

impl StoreKey {
    /// Start a key under a module prefix.
    pub fn new(prefix: &str) -> Self {
        Self(prefix.to_string())
    }

    /// Append a raw text segment.
    pub fn push(mut self, segment: &str) -> Self {
        self.0.push('/');
        self.0.push_str(segment);
        self
    }

    /// Append a hex-encoded byte segment.
    pub fn bytes(self, bytes: &[u8]) -> Self {
        let encoded = hex::encode(bytes);
        self.push(&encoded)
    }

    /// Append a chain id segment.
    pub fn chain(self, chain_id: ChainId) -> Self {
        let segment = format!("{chain_id:020}");
        self.push(&segment)
    }

    /// Append a zero-padded unsigned segment (heights, nonces, sequence numbers).
    pub fn height(self, value: u64) -> Self {
        let segment = format!("{value:020}");
        self.push(&segment)
    }

    /// Finish as a prefix suitable for `prefix_scan` (trailing separator).
    pub fn prefix(mut self) -> Vec<u8> {
        self.0.push('/');
        self.0.into_bytes()
    }

    /// Finish as a complete key.
    pub fn build(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Decode {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}

/// Read and decode a record.
pub fn get_record<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(bytes) => decode(key, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Encode and write a record.
pub fn put_record<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &[u8],
    value: &T,
) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    store.put(key, &bytes)
}

/// Delete a record.
pub fn delete_record(store: &mut dyn KeyValueStore, key: &[u8]) -> Result<(), StoreError> {
    store.delete(key)
}

/// Decode every record under a prefix, in key order.
pub fn scan_records<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, T)>, StoreError> {
    store
        .prefix_scan(prefix)?
        .into_iter()
        .map(|(key, bytes)| {
            let value = decode(&key, &bytes)?;
            Ok((key, value))
        })
        .collect()
}
