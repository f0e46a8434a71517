//! Vector index error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// usearch engine error
    #[error("Index error: {0}")]
    Engine(String),

    /// Vector length does not match the index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Ids and vectors of a batch differ in length
    #[error("Length mismatch: {ids} ids for {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    /// Index file exists but cannot be used
    #[error("Corrupt index at {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path cannot be handed to the engine
    #[error("Invalid path encoding: {0:?}")]
    InvalidPath(PathBuf),

    /// A thread panicked while holding a lock
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}
