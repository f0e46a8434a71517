//! Vector index handle.
//!
//! A handle owns the in-memory index of one namespace and knows where it is
//! persisted. Callers hold the handle's lock for a whole read-modify-persist
//! sequence; the handle itself does no locking.

use std::fs;
use std::path::{Path, PathBuf};

use cbir_features::Features;
use cbir_types::Namespace;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::index::{Neighbor, VectorIndex};

/// The open vector index of one namespace.
pub struct VectorIndexHandle {
    namespace: Namespace,
    path: PathBuf,
    index: Box<dyn VectorIndex>,
}

impl VectorIndexHandle {
    /// Load the index at `path`, or start an empty one if no file exists.
    pub fn open(namespace: Namespace, path: PathBuf, config: HnswConfig) -> Result<Self, IndexError> {
        let index = if path.exists() {
            HnswIndex::load(&path, config)?
        } else {
            info!(namespace = %namespace, dim = config.dimension, "Starting empty vector index");
            HnswIndex::create(config)?
        };
        Ok(Self::with_index(namespace, path, Box::new(index)))
    }

    /// Wrap an already constructed index.
    pub fn with_index(namespace: Namespace, path: PathBuf, index: Box<dyn VectorIndex>) -> Self {
        Self {
            namespace,
            path,
            index,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    pub fn get(&self, id: u64) -> Result<Option<Features>, IndexError> {
        self.index.get(id)
    }

    /// Insert `vectors[i]` under `ids[i]`.
    ///
    /// Every vector is checked before the first insert, so a bad batch leaves
    /// the index untouched.
    pub fn add(&mut self, ids: &[u64], vectors: &[Features]) -> Result<(), IndexError> {
        if ids.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }
        let expected = self.index.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.dimension() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.dimension(),
            });
        }

        for (id, vector) in ids.iter().zip(vectors) {
            self.index.add(*id, vector)?;
        }
        debug!(namespace = %self.namespace, count = ids.len(), "Added vectors");
        Ok(())
    }

    /// Remove `id`; absent ids are ignored.
    pub fn remove(&mut self, id: u64) -> Result<bool, IndexError> {
        self.index.remove(id)
    }

    /// Up to `k` nearest neighbors by ascending distance.
    ///
    /// Only the leading filled slots of the engine result are returned.
    pub fn search(&self, query: &Features, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let slots = self.index.search(query, k)?;
        Ok(slots.into_iter().map_while(|slot| slot).collect())
    }

    /// Write the index to disk, replacing the previous file atomically.
    pub fn persist(&self) -> Result<(), IndexError> {
        let tmp_path = self.tmp_path()?;
        if let Err(e) = self.index.save(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        info!(namespace = %self.namespace, vectors = self.index.len(), "Persisted vector index");
        Ok(())
    }

    /// `.{file}.tmp` next to the index file, so the rename never crosses
    /// filesystems.
    fn tmp_path(&self) -> Result<PathBuf, IndexError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IndexError::InvalidPath(self.path.clone()))?;
        Ok(self.path.with_file_name(format!(".{}.tmp", file_name)))
    }
}
