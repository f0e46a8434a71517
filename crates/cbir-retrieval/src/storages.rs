//! Storage management.
//!
//! A storage is a directory under the data path holding the index files of
//! its namespaces. Deleting a storage also drops its open handles and purges
//! its metadata, so a storage recreated under the same name starts empty.
//! Creation and deletion hold the storage's gate exclusively, so no index
//! operation on the storage runs while either is in progress.

use std::fs;
use std::io::ErrorKind;

use cbir_types::{validate_name, NameKind};
use tracing::info;

use crate::coordinator::{lock, write, IndexCoordinator};
use crate::error::RetrievalError;

impl IndexCoordinator {
    /// Create an empty storage.
    pub fn create_storage(&self, name: &str) -> Result<(), RetrievalError> {
        validate_name(NameKind::Storage, name)?;
        let gate = self.gate(name);
        let _storage = write(&gate)?;
        fs::create_dir_all(self.data_path())?;

        match fs::create_dir(self.data_path().join(name)) {
            Ok(()) => {
                info!(storage = %name, "Created storage");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(RetrievalError::StorageExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all storages, sorted.
    pub fn list_storages(&self) -> Result<Vec<String>, RetrievalError> {
        let entries = match fs::read_dir(self.data_path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn storage_exists(&self, name: &str) -> Result<bool, RetrievalError> {
        validate_name(NameKind::Storage, name)?;
        Ok(self.data_path().join(name).is_dir())
    }

    /// Delete a storage with all its indexes and metadata.
    ///
    /// Returns the number of purged metadata entries.
    pub fn delete_storage(&self, name: &str) -> Result<usize, RetrievalError> {
        validate_name(NameKind::Storage, name)?;
        let gate = self.gate(name);
        let _storage = write(&gate)?;
        if !self.data_path().join(name).is_dir() {
            return Err(RetrievalError::StorageNotFound(name.to_string()));
        }

        // Handles taken straight from the cache bypass the gate.
        let evicted = self.handles().evict_storage(name)?;
        let _guards = evicted
            .iter()
            .map(lock)
            .collect::<Result<Vec<_>, _>>()?;

        fs::remove_dir_all(self.data_path().join(name))?;
        let purged = self.metadata().purge_storage(name)?;

        info!(storage = %name, handles = evicted.len(), purged, "Deleted storage");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbir_features::Features;
    use cbir_index::{HandleCache, HnswConfig};
    use cbir_storage::{MemoryStore, MetadataStore};
    use cbir_types::Namespace;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn coordinator(temp: &TempDir) -> IndexCoordinator {
        IndexCoordinator::new(
            HandleCache::new(temp.path().join("data"), HnswConfig::new(2), 4),
            MetadataStore::new(Arc::new(MemoryStore::new())),
        )
    }

    #[test]
    fn test_create_and_list() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        assert!(coord.list_storages().unwrap().is_empty());

        coord.create_storage("b").unwrap();
        coord.create_storage("a").unwrap();
        fs::create_dir(temp.path().join("data").join(".hidden")).unwrap();
        fs::write(temp.path().join("data").join("file"), b"").unwrap();

        assert_eq!(coord.list_storages().unwrap(), vec!["a", "b"]);
        assert!(coord.storage_exists("a").unwrap());
        assert!(!coord.storage_exists("c").unwrap());
    }

    #[test]
    fn test_create_twice() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        coord.create_storage("a").unwrap();
        assert!(matches!(
            coord.create_storage("a"),
            Err(RetrievalError::StorageExists(_))
        ));
    }

    #[test]
    fn test_invalid_names() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        assert!(matches!(
            coord.create_storage("../escape"),
            Err(RetrievalError::Name(_))
        ));
        assert!(matches!(coord.create_storage(""), Err(RetrievalError::Name(_))));
    }

    #[test]
    fn test_delete_purges_everything() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        coord.create_storage("a").unwrap();
        let ns = Namespace::new("a", "x").unwrap();

        coord
            .index_image(&ns, "f.png", Features::new(vec![1.0, 1.0]))
            .unwrap();
        assert!(coord.handles().is_open(&ns).unwrap());

        assert_eq!(coord.delete_storage("a").unwrap(), 3);
        assert!(!coord.storage_exists("a").unwrap());
        assert!(!coord.handles().is_open(&ns).unwrap());

        coord.create_storage("a").unwrap();
        assert!(!coord.contains(&ns, "f.png").unwrap());
        assert_eq!(coord.stats(&ns).unwrap().last_id, 0);
        assert!(coord
            .search(&ns, &Features::new(vec![1.0, 1.0]), 1)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_missing() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        assert!(matches!(
            coord.delete_storage("a"),
            Err(RetrievalError::StorageNotFound(_))
        ));
    }

    #[test]
    fn test_delete_while_indexing_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let coord = coordinator(&temp);
        coord.create_storage("a").unwrap();
        let ns = Namespace::new("a", "x").unwrap();
        let start = Barrier::new(4);

        thread::scope(|s| {
            for t in 0..3 {
                let (coord, ns, start) = (&coord, &ns, &start);
                s.spawn(move || {
                    start.wait();
                    for i in 0..50 {
                        let features = Features::new(vec![t as f32, i as f32]);
                        match coord.index_image(ns, &format!("{}-{}.png", t, i), features) {
                            Ok(_) => {}
                            Err(RetrievalError::StorageNotFound(_)) => break,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                });
            }
            start.wait();
            coord.delete_storage("a").unwrap();
        });

        assert!(!coord.storage_exists("a").unwrap());
        assert!(!coord.handles().is_open(&ns).unwrap());

        coord.create_storage("a").unwrap();
        let stats = coord.stats(&ns).unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.last_id, 0);
        assert_eq!(stats.vectors, 0);
    }
}
