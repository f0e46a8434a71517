//! Filename <-> id metadata.
//!
//! Each indexed image has two entries: `filename -> id` (existence checks and
//! removal) and `id -> filename` (resolving search results in O(1)). The
//! reverse entry is written first and deleted last, so a visible filename
//! entry always has its label.

use std::sync::Arc;

use cbir_types::Namespace;
use tracing::debug;

use crate::error::StorageError;
use crate::keys::{parse_id, CounterKey, FilenameKey, LabelKey};
use crate::store::{KeyValueStore, Keyspace};

/// Typed metadata client over a [`KeyValueStore`].
#[derive(Clone)]
pub struct MetadataStore {
    store: Arc<dyn KeyValueStore>,
}

impl MetadataStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Check if a filename is indexed in the namespace.
    pub fn contains(&self, ns: &Namespace, filename: &str) -> Result<bool, StorageError> {
        self.store
            .exists(Keyspace::Filenames, &FilenameKey::new(ns, filename).encode())
    }

    /// Find the id of a filename.
    pub fn id_for(&self, ns: &Namespace, filename: &str) -> Result<Option<u64>, StorageError> {
        let key = FilenameKey::new(ns, filename).encode();
        match self.store.get(Keyspace::Filenames, &key)? {
            Some(value) => Ok(Some(parse_id(&key, &value)?)),
            None => Ok(None),
        }
    }

    /// Find the filename of an id.
    pub fn filename_for(&self, ns: &Namespace, id: u64) -> Result<Option<String>, StorageError> {
        self.store
            .get(Keyspace::Labels, &LabelKey::new(ns, id).encode())
    }

    /// Record that `filename` is stored under `id`.
    pub fn insert(&self, ns: &Namespace, filename: &str, id: u64) -> Result<(), StorageError> {
        self.store
            .set(Keyspace::Labels, &LabelKey::new(ns, id).encode(), filename)?;
        self.store.set(
            Keyspace::Filenames,
            &FilenameKey::new(ns, filename).encode(),
            &id.to_string(),
        )?;
        debug!(namespace = %ns, filename = %filename, id, "Saved metadata entry");
        Ok(())
    }

    /// Remove a filename and its label. Returns the id it was stored under.
    pub fn remove(&self, ns: &Namespace, filename: &str) -> Result<Option<u64>, StorageError> {
        let Some(id) = self.id_for(ns, filename)? else {
            return Ok(None);
        };
        self.store
            .delete(Keyspace::Filenames, &FilenameKey::new(ns, filename).encode())?;
        self.store
            .delete(Keyspace::Labels, &LabelKey::new(ns, id).encode())?;
        debug!(namespace = %ns, filename = %filename, id, "Removed metadata entry");
        Ok(Some(id))
    }

    /// Next unallocated id of the namespace (0 when never written).
    pub fn last_id(&self, ns: &Namespace) -> Result<u64, StorageError> {
        let key = CounterKey::new(ns).encode();
        match self.store.get(Keyspace::Counters, &key)? {
            Some(value) => parse_id(&key, &value),
            None => Ok(0),
        }
    }

    pub fn set_last_id(&self, ns: &Namespace, last_id: u64) -> Result<(), StorageError> {
        self.store.set(
            Keyspace::Counters,
            &CounterKey::new(ns).encode(),
            &last_id.to_string(),
        )
    }

    /// Number of indexed filenames in the namespace.
    pub fn count(&self, ns: &Namespace) -> Result<usize, StorageError> {
        Ok(self
            .store
            .scan_prefix(Keyspace::Filenames, &ns.key_prefix())?
            .len())
    }

    /// All `(filename, id)` pairs of the namespace, ordered by id.
    pub fn entries(&self, ns: &Namespace) -> Result<Vec<(String, u64)>, StorageError> {
        self.store
            .scan_prefix(Keyspace::Labels, &ns.key_prefix())?
            .into_iter()
            .map(|(key, filename)| Ok((filename, LabelKey::decode_id(ns, &key)?)))
            .collect()
    }

    /// Delete every entry of every namespace in `storage`, counters included.
    ///
    /// Returns the number of deleted entries.
    pub fn purge_storage(&self, storage: &str) -> Result<usize, StorageError> {
        let prefix = Namespace::storage_prefix(storage);
        let mut deleted = 0;
        for keyspace in Keyspace::ALL {
            deleted += self.store.delete_prefix(keyspace, &prefix)?;
        }
        debug!(storage = %storage, deleted, "Purged storage metadata");
        Ok(deleted)
    }

    /// Flush the underlying store.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.store.flush()
    }
}
