//! # Transactional Overlay
//!
//! `CacheStore` buffers writes on top of a read-only parent store. Reads see
//! the buffered writes first and fall through to the parent otherwise. The
//! buffered writes reach the parent only through one `atomic_batch_write`
//! when the caller commits; dropping the overlay discards them.
//!
//! Overlays nest: a block overlay wraps the committed snapshot, each
//! transaction runs in an overlay over the block overlay, and multi-step
//! transitions inside a transaction open their own overlay again.

use std::collections::BTreeMap;

use crate::{BatchOperation, KeyValueStore, ScanResult, StoreError};

/// Write-buffering view over a parent store.
pub struct CacheStore<'a> {
    parent: &'a dyn KeyValueStore,
    /// `None` marks a buffered delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    /// Open an overlay over `parent`.
    pub fn new(parent: &'a dyn KeyValueStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// True if any write is buffered.
    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Number of buffered writes (puts and deletes).
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Consume the overlay, yielding its writes as a batch in key order.
    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::Put { key, value },
                None => BatchOperation::Delete { key },
            })
            .collect()
    }
}

impl KeyValueStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.writes.insert(key, Some(value));
                }
                BatchOperation::Delete { key } => {
                    self.writes.insert(key, None);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.is_some()),
            None => self.parent.exists(key),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

/// Run `f` against a fresh overlay over `store` and commit only on `Ok`.
///
/// On `Err` nothing `f` wrote is visible in `store`.
pub fn with_overlay<T, E, F>(store: &mut dyn KeyValueStore, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn KeyValueStore) -> Result<T, E>,
    E: From<StoreError>,
{
    let (outcome, operations) = {
        let mut cache = CacheStore::new(&*store);
        let outcome = f(&mut cache);
        (outcome, cache.into_operations())
    };

    let value = outcome?;
    if !operations.is_empty() {
        store.atomic_batch_write(operations)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKVStore;

    fn create_test_store() -> InMemoryKVStore {
        let mut store = InMemoryKVStore::new();
        store.put(b"x/1", b"one").unwrap();
        store.put(b"x/2", b"two").unwrap();
        store.put(b"y/1", b"other").unwrap();
        store
    }

    #[test]
    fn test_reads_fall_through_and_writes_shadow() {
        let parent = create_test_store();
        let mut cache = CacheStore::new(&parent);

        assert_eq!(cache.get(b"x/1").unwrap(), Some(b"one".to_vec()));
        cache.put(b"x/1", b"uno").unwrap();
        cache.delete(b"x/2").unwrap();

        assert_eq!(cache.get(b"x/1").unwrap(), Some(b"uno".to_vec()));
        assert!(!cache.exists(b"x/2").unwrap());
        // Parent untouched until commit
        assert_eq!(parent.get(b"x/2").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_prefix_scan_merges_buffered_writes() {
        let parent = create_test_store();
        let mut cache = CacheStore::new(&parent);
        cache.delete(b"x/1").unwrap();
        cache.put(b"x/3", b"three").unwrap();

        let keys: Vec<_> = cache
            .prefix_scan(b"x/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"x/2".to_vec(), b"x/3".to_vec()]);
    }

    #[test]
    fn test_with_overlay_commits_on_ok() {
        let mut store = create_test_store();
        let result: Result<u8, StoreError> = with_overlay(&mut store, |s| {
            s.put(b"z/1", b"new")?;
            Ok(7)
        });

        assert_eq!(result, Ok(7));
        assert_eq!(store.get(b"z/1").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_with_overlay_discards_on_err() {
        let mut store = create_test_store();
        let result: Result<(), StoreError> = with_overlay(&mut store, |s| {
            s.put(b"z/1", b"new")?;
            s.delete(b"x/1")?;
            Err(StoreError::Backend("step failed".to_string()))
        });

        assert!(result.is_err());
        assert!(!store.exists(b"z/1").unwrap());
        assert!(store.exists(b"x/1").unwrap());
    }

    #[test]
    fn test_nested_overlays() {
        let mut store = create_test_store();
        let result: Result<(), StoreError> = with_overlay(&mut store, |outer| {
            outer.put(b"a", b"outer")?;
            let inner: Result<(), StoreError> = with_overlay(outer, |inner| {
                inner.put(b"b", b"inner")?;
                Err(StoreError::Backend("inner failed".to_string()))
            });
            assert!(inner.is_err());
            with_overlay(outer, |inner| inner.put(b"c", b"kept"))
        });

        assert!(result.is_ok());
        assert!(store.exists(b"a").unwrap());
        assert!(!store.exists(b"b").unwrap());
        assert!(store.exists(b"c").unwrap());
    }
}
