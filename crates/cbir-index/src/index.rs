//! Vector index trait and types.
//!
//! Engines pad short results with a sentinel key. Implementations translate
//! that at the boundary, so callers only ever see [`SearchSlot`] values.

use std::path::Path;

use cbir_features::Features;

use crate::error::IndexError;

/// Key the engine reports for an empty result slot.
pub const SENTINEL_KEY: u64 = u64::MAX;

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: u64,
    /// Squared Euclidean distance (lower = more similar)
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: u64, distance: f32) -> Self {
        Self { id, distance }
    }
}

/// One position of a raw search result; `None` when the engine had nothing
/// to put there.
pub type SearchSlot = Option<Neighbor>;

/// Trait for vector indexes.
///
/// Callers serialize access per namespace, so mutation takes `&mut self`.
pub trait VectorIndex: Send + Sync {
    /// Get the vector dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a vector under an explicit id.
    fn add(&mut self, id: u64, features: &Features) -> Result<(), IndexError>;

    /// Search for the `k` nearest vectors.
    ///
    /// Always returns exactly `k` slots ordered by ascending distance, with
    /// empty slots after every filled one.
    fn search(&self, query: &Features, k: usize) -> Result<Vec<SearchSlot>, IndexError>;

    /// Remove a vector by id. Returns false if it was not present.
    fn remove(&mut self, id: u64) -> Result<bool, IndexError>;

    /// Check if a vector id exists
    fn contains(&self, id: u64) -> bool;

    /// The stored vector for `id`, if present.
    fn get(&self, id: u64) -> Result<Option<Features>, IndexError>;

    /// Serialize the whole index to `path`.
    fn save(&self, path: &Path) -> Result<(), IndexError>;
}
