//! Index coordinator.
//!
//! Drives the id allocator, the vector index handle and the metadata store
//! for one operation at a time per namespace. Every operation holds its
//! storage's gate for reading and the namespace's handle lock from its first
//! read to its last write. Deleting a storage takes the gate for writing.
//!
//! The index file and the metadata store are independently durable. Writes
//! go index first, counter second, metadata last:
//! - a crash after persisting the index leaves vectors without metadata;
//!   they never show up in search results, and the next allocation skips
//!   past their ids
//! - a crash after advancing the counter leaves unused ids behind; they are
//!   never handed out again
//! - a crash after removing a vector but before deleting its metadata leaves
//!   a filename that can be removed again but never matches a search

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cbir_features::Features;
use cbir_index::{HandleCache, SharedHandle, VectorIndexHandle};
use cbir_storage::{IdAllocator, IdBlock, MetadataStore};
use cbir_types::Namespace;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RetrievalError;

/// One resolved search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub filename: String,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Counters of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceStats {
    pub storage: String,
    pub index: String,
    /// Vectors in the index
    pub vectors: usize,
    /// Filenames in the metadata store
    pub entries: usize,
    /// Next id the allocator will hand out
    pub last_id: u64,
    pub dimension: usize,
}

/// Shared by every operation on one storage, exclusive while it is
/// created or deleted.
pub(crate) type StorageGate = Arc<RwLock<()>>;

/// Coordinates the vector index and metadata of every namespace.
pub struct IndexCoordinator {
    handles: HandleCache,
    metadata: MetadataStore,
    allocator: IdAllocator,
    gates: DashMap<String, StorageGate>,
}

impl IndexCoordinator {
    pub fn new(handles: HandleCache, metadata: MetadataStore) -> Self {
        let allocator = IdAllocator::new(metadata.clone());
        Self {
            handles,
            metadata,
            allocator,
            gates: DashMap::new(),
        }
    }

    pub fn data_path(&self) -> &Path {
        self.handles.data_path()
    }

    pub fn handles(&self) -> &HandleCache {
        &self.handles
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Feature count every vector must have.
    pub fn dimension(&self) -> usize {
        self.handles.config().dimension
    }

    /// Index one image; returns its id.
    pub fn index_image(
        &self,
        ns: &Namespace,
        filename: &str,
        features: Features,
    ) -> Result<u64, RetrievalError> {
        let ids = self.index_images(ns, vec![(filename.to_string(), features)])?;
        ids.first()
            .copied()
            .ok_or_else(|| RetrievalError::InvalidArgument("no id allocated".to_string()))
    }

    /// Index several images under one contiguous id block.
    ///
    /// Nothing is written unless every filename is new and unique within the
    /// batch.
    pub fn index_images(
        &self,
        ns: &Namespace,
        images: Vec<(String, Features)>,
    ) -> Result<Vec<u64>, RetrievalError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::with_capacity(images.len());
        for (filename, _) in &images {
            if filename.is_empty() {
                return Err(RetrievalError::InvalidArgument(
                    "filename is empty".to_string(),
                ));
            }
            if !seen.insert(filename.as_str()) {
                return Err(RetrievalError::DuplicateInBatch(filename.clone()));
            }
        }
        let gate = self.gate(ns.storage());
        let _storage = read(&gate)?;
        self.ensure_storage(ns)?;

        let shared = self.handles.get(ns)?;
        let mut handle = lock(&shared)?;

        for (filename, _) in &images {
            if self.metadata.contains(ns, filename)? {
                return Err(RetrievalError::AlreadyIndexed {
                    namespace: ns.to_string(),
                    filename: filename.clone(),
                });
            }
        }

        let (filenames, vectors): (Vec<String>, Vec<Features>) = images.into_iter().unzip();
        let block = self.allocate_block(ns, &handle, vectors.len())?;
        let ids: Vec<u64> = block.ids().collect();

        if let Err(e) = handle.add(&ids, &vectors) {
            rollback(&mut handle, &ids);
            return Err(e.into());
        }
        if let Err(e) = handle.persist() {
            rollback(&mut handle, &ids);
            return Err(RetrievalError::Persist {
                namespace: ns.to_string(),
                source: e,
            });
        }

        self.allocator.advance(ns, block.end)?;
        for (filename, id) in filenames.iter().zip(&ids) {
            self.metadata.insert(ns, filename, *id)?;
        }

        info!(namespace = %ns, count = ids.len(), first_id = block.start, "Indexed images");
        Ok(ids)
    }

    /// Remove an image. Returns its id, or `None` if it was not indexed.
    pub fn remove_image(
        &self,
        ns: &Namespace,
        filename: &str,
    ) -> Result<Option<u64>, RetrievalError> {
        let gate = self.gate(ns.storage());
        let _storage = read(&gate)?;
        self.ensure_storage(ns)?;

        let shared = self.handles.get(ns)?;
        let mut handle = lock(&shared)?;

        let Some(id) = self.metadata.id_for(ns, filename)? else {
            debug!(namespace = %ns, filename = %filename, "Nothing to remove");
            return Ok(None);
        };

        let stored = handle.get(id)?;
        if !handle.remove(id)? {
            warn!(namespace = %ns, id, "Vector already missing from index");
        }
        if let Err(e) = handle.persist() {
            if let Some(features) = stored {
                restore(&mut handle, id, features);
            }
            return Err(RetrievalError::Persist {
                namespace: ns.to_string(),
                source: e,
            });
        }
        self.metadata.remove(ns, filename)?;

        info!(namespace = %ns, filename = %filename, id, "Removed image");
        Ok(Some(id))
    }

    /// The `k` indexed images closest to `query`, nearest first.
    pub fn search(
        &self,
        ns: &Namespace,
        query: &Features,
        k: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "number of neighbors must be positive".to_string(),
            ));
        }
        let gate = self.gate(ns.storage());
        let _storage = read(&gate)?;
        self.ensure_storage(ns)?;

        let shared = self.handles.get(ns)?;
        let handle = lock(&shared)?;

        let neighbors = handle.search(query, k)?;
        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            match self.metadata.filename_for(ns, neighbor.id)? {
                Some(filename) => hits.push(SearchHit {
                    filename,
                    distance: neighbor.distance,
                }),
                None => {
                    warn!(namespace = %ns, id = neighbor.id, "Skipping vector without metadata");
                }
            }
        }

        debug!(namespace = %ns, k, found = hits.len(), "Search complete");
        Ok(hits)
    }

    pub fn stats(&self, ns: &Namespace) -> Result<NamespaceStats, RetrievalError> {
        let gate = self.gate(ns.storage());
        let _storage = read(&gate)?;
        self.ensure_storage(ns)?;
        let shared = self.handles.get(ns)?;
        let handle = lock(&shared)?;

        Ok(NamespaceStats {
            storage: ns.storage().to_string(),
            index: ns.index().to_string(),
            vectors: handle.len(),
            entries: self.metadata.count(ns)?,
            last_id: self.allocator.next_id(ns)?,
            dimension: handle.dimension(),
        })
    }

    /// Whether `filename` is indexed in the namespace.
    pub fn contains(&self, ns: &Namespace, filename: &str) -> Result<bool, RetrievalError> {
        Ok(self.metadata.contains(ns, filename)?)
    }

    pub(crate) fn gate(&self, storage: &str) -> StorageGate {
        self.gates.entry(storage.to_string()).or_default().clone()
    }

    pub(crate) fn ensure_storage(&self, ns: &Namespace) -> Result<(), RetrievalError> {
        if ns.storage_dir(self.data_path()).is_dir() {
            Ok(())
        } else {
            Err(RetrievalError::StorageNotFound(ns.storage().to_string()))
        }
    }

    /// Reserve `count` ids, skipping past any the index already holds.
    fn allocate_block(
        &self,
        ns: &Namespace,
        handle: &VectorIndexHandle,
        count: usize,
    ) -> Result<IdBlock, RetrievalError> {
        let mut block = self.allocator.allocate(ns, count)?;
        while let Some(orphan) = block.ids().rev().find(|id| handle.contains(*id)) {
            warn!(namespace = %ns, id = orphan, "Index holds an unallocated id, skipping past it");
            block = self.allocator.allocate_from(ns, orphan + 1, count)?;
        }
        Ok(block)
    }
}

pub(crate) fn lock(
    shared: &SharedHandle,
) -> Result<MutexGuard<'_, VectorIndexHandle>, RetrievalError> {
    shared
        .lock()
        .map_err(|e| RetrievalError::LockPoisoned(format!("Failed to acquire index lock: {}", e)))
}

fn read(gate: &StorageGate) -> Result<RwLockReadGuard<'_, ()>, RetrievalError> {
    gate.read()
        .map_err(|e| RetrievalError::LockPoisoned(format!("Failed to acquire storage lock: {}", e)))
}

pub(crate) fn write(gate: &StorageGate) -> Result<RwLockWriteGuard<'_, ()>, RetrievalError> {
    gate.write()
        .map_err(|e| RetrievalError::LockPoisoned(format!("Failed to acquire storage lock: {}", e)))
}

/// Put back a vector whose removal could not be persisted.
fn restore(handle: &mut VectorIndexHandle, id: u64, features: Features) {
    if let Err(e) = handle.add(&[id], &[features]) {
        warn!(namespace = %handle.namespace(), id, error = %e, "Failed to restore vector");
    }
}

fn rollback(handle: &mut VectorIndexHandle, ids: &[u64]) {
    for id in ids {
        if let Err(e) = handle.remove(*id) {
            warn!(namespace = %handle.namespace(), id, error = %e, "Failed to roll back vector");
        }
    }
}
