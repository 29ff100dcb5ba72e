//! # Key-Value Store Port
//!
//! Byte-keyed, byte-valued storage used for every persisted bridge entity.
//! The host treats the store as a durable, block-atomic map; components never
//! rely on foreign-key enforcement from it.

use std::collections::BTreeMap;

use crate::StoreError;

/// Result of a prefix scan: key/value pairs in ascending key order.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for key-value database operations.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Iterate over keys with a prefix, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// Key
        key: Vec<u8>,
    },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// In-memory key-value store.
///
/// Backed by an ordered map so prefix scans are deterministic. Cloning is a
/// deep copy, which is how committed snapshots are produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        // Nothing in-memory can fail half way, so apply in order
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        let results: Vec<_> = self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_kv_store() {
        let mut store = InMemoryKVStore::new();

        store.put(b"key1", b"value1").unwrap();
        store.put(b"key2", b"value2").unwrap();

        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"key3").unwrap(), None);
        assert!(store.exists(b"key2").unwrap());

        store.delete(b"key1").unwrap();
        assert!(!store.exists(b"key1").unwrap());
    }

    #[test]
    fn test_atomic_batch_write() {
        let mut store = InMemoryKVStore::new();
        store.put(b"gone", b"x").unwrap();

        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
                BatchOperation::delete(b"gone".to_vec()),
            ])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(!store.exists(b"gone").unwrap());
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let mut store = InMemoryKVStore::new();
        store.put(b"nonce/2", b"b").unwrap();
        store.put(b"nonce/1", b"a").unwrap();
        store.put(b"nonceX", b"no").unwrap();
        store.put(b"other", b"no").unwrap();

        let results = store.prefix_scan(b"nonce/").unwrap();
        let keys: Vec<_> = results.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"nonce/1".to_vec(), b"nonce/2".to_vec()]);
    }
}
