//! Cache of open vector index handles.
//!
//! At most `capacity` idle handles stay open, evicted least-recently-used
//! first. A handle that an operation still holds is never evicted, so two
//! live handles for the same namespace cannot exist and diverge.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use cbir_types::Namespace;
use lru::LruCache;
use tracing::debug;

use crate::error::IndexError;
use crate::handle::VectorIndexHandle;
use crate::hnsw::HnswConfig;

/// A handle shared between the cache and in-flight operations.
pub type SharedHandle = Arc<Mutex<VectorIndexHandle>>;

/// LRU map from namespace to its open handle.
pub struct HandleCache {
    data_path: PathBuf,
    config: HnswConfig,
    capacity: usize,
    handles: Mutex<LruCache<Namespace, SharedHandle>>,
}

impl HandleCache {
    pub fn new(data_path: impl Into<PathBuf>, config: HnswConfig, capacity: usize) -> Self {
        Self {
            data_path: data_path.into(),
            config,
            capacity: capacity.max(1),
            handles: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of open handles (may briefly exceed capacity while handles
    /// are in use).
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Whether `ns` currently has an open handle.
    pub fn is_open(&self, ns: &Namespace) -> Result<bool, IndexError> {
        Ok(self.lock()?.contains(ns))
    }

    /// Return the handle of `ns`, opening it on first use.
    pub fn get(&self, ns: &Namespace) -> Result<SharedHandle, IndexError> {
        if let Some(handle) = self.lock()?.get(ns) {
            return Ok(Arc::clone(handle));
        }

        // Loading may read a large file; keep other namespaces unblocked.
        let opened = VectorIndexHandle::open(
            ns.clone(),
            ns.index_file(&self.data_path),
            self.config.clone(),
        )?;

        let mut handles = self.lock()?;
        if let Some(existing) = handles.get(ns) {
            return Ok(Arc::clone(existing));
        }
        let shared = Arc::new(Mutex::new(opened));
        handles.put(ns.clone(), Arc::clone(&shared));
        debug!(namespace = %ns, open = handles.len(), "Opened index handle");
        self.evict_idle(&mut handles);
        Ok(shared)
    }

    /// Drop every handle of `storage` from the cache and return them, so the
    /// caller can wait for in-flight operations before touching the files.
    pub fn evict_storage(&self, storage: &str) -> Result<Vec<SharedHandle>, IndexError> {
        let mut handles = self.lock()?;
        let victims: Vec<Namespace> = handles
            .iter()
            .filter(|(ns, _)| ns.storage() == storage)
            .map(|(ns, _)| ns.clone())
            .collect();

        let evicted: Vec<SharedHandle> = victims
            .iter()
            .filter_map(|ns| handles.pop(ns))
            .collect();
        debug!(storage = %storage, count = evicted.len(), "Evicted storage handles");
        Ok(evicted)
    }

    fn evict_idle(&self, handles: &mut LruCache<Namespace, SharedHandle>) {
        while handles.len() > self.capacity {
            let victim = handles
                .iter()
                .rev()
                .find(|(_, handle)| Arc::strong_count(handle) == 1)
                .map(|(ns, _)| ns.clone());
            match victim {
                Some(ns) => {
                    handles.pop(&ns);
                    debug!(namespace = %ns, "Evicted idle index handle");
                }
                None => break,
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<Namespace, SharedHandle>>, IndexError> {
        self.handles
            .lock()
            .map_err(|e| IndexError::LockPoisoned(format!("Failed to acquire cache lock: {}", e)))
    }
}
