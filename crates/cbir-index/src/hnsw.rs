//! HNSW index implementation using usearch.
//!
//! Distances are squared Euclidean (`MetricKind::L2sq`). Keys are the ids
//! handed out by the id allocator; the engine never chooses them.

use std::path::Path;

use cbir_features::Features;
use cbir_types::Settings;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::IndexError;
use crate::index::{Neighbor, SearchSlot, VectorIndex, SENTINEL_KEY};

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Vector dimension (must match the extractor)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Slots reserved when a new index is created
    pub initial_capacity: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: 128,
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            initial_capacity: 1024,
        }
    }
}

impl HnswConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dimension: settings.n_features,
            connectivity: settings.index.connectivity,
            expansion_add: settings.index.expansion_add,
            expansion_search: settings.index.expansion_search,
            initial_capacity: settings.index.initial_capacity,
        }
    }

    pub fn with_connectivity(mut self, m: usize) -> Self {
        self.connectivity = m;
        self
    }

    pub fn with_expansion(mut self, ef_add: usize, ef_search: usize) -> Self {
        self.expansion_add = ef_add;
        self.expansion_search = ef_search;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false,
        }
    }
}

/// HNSW index wrapper around usearch.
pub struct HnswIndex {
    index: Index,
    config: HnswConfig,
}

impl HnswIndex {
    /// Create an empty index.
    pub fn create(config: HnswConfig) -> Result<Self, IndexError> {
        let index = Index::new(&config.options()).map_err(|e| IndexError::Engine(e.to_string()))?;
        index
            .reserve(config.initial_capacity)
            .map_err(|e| IndexError::Engine(e.to_string()))?;
        debug!(dim = config.dimension, "Created vector index");
        Ok(Self { index, config })
    }

    /// Load a serialized index, checking that it was built for
    /// `config.dimension`.
    pub fn load(path: &Path, config: HnswConfig) -> Result<Self, IndexError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| IndexError::InvalidPath(path.to_path_buf()))?;
        let index = Index::new(&config.options()).map_err(|e| IndexError::Engine(e.to_string()))?;
        index.load(path_str).map_err(|e| IndexError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("Failed to load: {}", e),
        })?;

        if index.dimensions() != config.dimension {
            return Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "index has dimension {}, expected {}",
                    index.dimensions(),
                    config.dimension
                ),
            });
        }

        info!(path = ?path, vectors = index.size(), "Loaded vector index");
        Ok(Self { index, config })
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Grow the reserved capacity so `additional` more vectors fit.
    pub fn ensure_capacity(&self, additional: usize) -> Result<(), IndexError> {
        let needed = self.index.size() + additional;
        let capacity = self.index.capacity();
        if needed <= capacity {
            return Ok(());
        }
        let target = needed
            .max(capacity.saturating_mul(2))
            .max(self.config.initial_capacity);
        self.index
            .reserve(target)
            .map_err(|e| IndexError::Engine(e.to_string()))?;
        debug!(capacity = target, "Grew vector index capacity");
        Ok(())
    }

    fn check_dimension(&self, features: &Features) -> Result<(), IndexError> {
        if features.dimension() != self.config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: features.dimension(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, id: u64, features: &Features) -> Result<(), IndexError> {
        self.check_dimension(features)?;
        self.ensure_capacity(1)?;
        self.index
            .add(id, features.as_slice())
            .map_err(|e| IndexError::Engine(e.to_string()))?;

        debug!(id = id, "Added vector");
        Ok(())
    }

    fn search(&self, query: &Features, k: usize) -> Result<Vec<SearchSlot>, IndexError> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(query.as_slice(), k)
            .map_err(|e| IndexError::Engine(e.to_string()))?;

        let mut slots: Vec<SearchSlot> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .take(k)
            .map(|(&id, &distance)| {
                (id != SENTINEL_KEY && distance.is_finite()).then(|| Neighbor::new(id, distance))
            })
            .collect();
        slots.resize(k, None);

        debug!(k = k, found = slots.iter().flatten().count(), "Search complete");
        Ok(slots)
    }

    fn remove(&mut self, id: u64) -> Result<bool, IndexError> {
        let removed = self
            .index
            .remove(id)
            .map_err(|e| IndexError::Engine(e.to_string()))?;

        if removed > 0 {
            debug!(id = id, "Removed vector");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    fn get(&self, id: u64) -> Result<Option<Features>, IndexError> {
        if !self.index.contains(id) {
            return Ok(None);
        }
        let mut values = vec![0.0f32; self.config.dimension];
        let found = self
            .index
            .get(id, &mut values)
            .map_err(|e| IndexError::Engine(e.to_string()))?;
        Ok((found > 0).then(|| Features::new(values)))
    }

    fn save(&self, path: &Path) -> Result<(), IndexError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| IndexError::InvalidPath(path.to_path_buf()))?;
        self.index
            .save(path_str)
            .map_err(|e| IndexError::Engine(format!("Failed to save: {}", e)))?;

        debug!(path = ?path, vectors = self.index.size(), "Saved vector index");
        Ok(())
    }
}
