//! # cbir-index
//!
//! Vector indexes for the CBIR index coordinator.
//!
//! One HNSW index (via usearch) per namespace, stored as a single file at
//! `{data_path}/{storage}/{index}`.
//!
//! ## Features
//! - Squared Euclidean search with explicit integer ids
//! - Explicit optional search slots instead of engine sentinel keys
//! - Atomic persistence (temporary file, then rename)
//! - Bounded LRU cache of open handles that never drops a handle in use

pub mod cache;
pub mod error;
pub mod handle;
pub mod hnsw;
pub mod index;

pub use cache::{HandleCache, SharedHandle};
pub use error::IndexError;
pub use handle::VectorIndexHandle;
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{Neighbor, SearchSlot, VectorIndex, SENTINEL_KEY};
