//! In-memory metadata store.
//!
//! Nothing survives the process; used by tests and ephemeral deployments.

use std::collections::BTreeMap;

use dashmap::DashMap;

use crate::error::StorageError;
use crate::store::{KeyValueStore, Keyspace};

/// [`KeyValueStore`] backed by one ordered map per keyspace.
#[derive(Default)]
pub struct MemoryStore {
    keyspaces: DashMap<Keyspace, BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all keyspaces
    pub fn len(&self) -> usize {
        self.keyspaces.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keyspace: Keyspace, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .keyspaces
            .get(&keyspace)
            .and_then(|map| map.get(key).cloned()))
    }

    fn set(&self, keyspace: Keyspace, key: &str, value: &str) -> Result<(), StorageError> {
        self.keyspaces
            .entry(keyspace)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, keyspace: Keyspace, key: &str) -> Result<(), StorageError> {
        if let Some(mut map) = self.keyspaces.get_mut(&keyspace) {
            map.remove(key);
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        keyspace: Keyspace,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StorageError> {
        let Some(map) = self.keyspaces.get(&keyspace) else {
            return Ok(Vec::new());
        };
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn delete_prefix(&self, keyspace: Keyspace, prefix: &str) -> Result<usize, StorageError> {
        let Some(mut map) = self.keyspaces.get_mut(&keyspace) else {
            return Ok(0);
        };
        let before = map.len();
        map.retain(|key, _| !key.starts_with(prefix));
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set(Keyspace::Labels, "a:x:1", "one.png").unwrap();
        assert_eq!(
            store.get(Keyspace::Labels, "a:x:1").unwrap(),
            Some("one.png".to_string())
        );
        assert_eq!(store.len(), 1);

        store.delete(Keyspace::Labels, "a:x:1").unwrap();
        assert!(!store.exists(Keyspace::Labels, "a:x:1").unwrap());
        store.delete(Keyspace::Labels, "a:x:1").unwrap();
    }

    #[test]
    fn test_scan_and_delete_prefix() {
        let store = MemoryStore::new();
        store.set(Keyspace::Filenames, "a:x:b.png", "1").unwrap();
        store.set(Keyspace::Filenames, "a:x:a.png", "0").unwrap();
        store.set(Keyspace::Filenames, "a:xy:a.png", "0").unwrap();

        let keys: Vec<String> = store
            .scan_prefix(Keyspace::Filenames, "a:x:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a:x:a.png", "a:x:b.png"]);

        assert_eq!(store.delete_prefix(Keyspace::Filenames, "a:x:").unwrap(), 2);
        assert_eq!(store.len(), 1);
    }
}
