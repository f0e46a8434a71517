//! Retrieval error types.

use cbir_features::FeatureError;
use cbir_index::IndexError;
use cbir_storage::StorageError;
use cbir_types::CbirError;
use thiserror::Error;

/// Errors from coordinator operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Storage directory does not exist
    #[error("Storage not found: {0}")]
    StorageNotFound(String),

    /// Storage directory already exists
    #[error("Storage already exists: {0}")]
    StorageExists(String),

    /// Filename already has an id in the namespace
    #[error("Image {filename} is already indexed in {namespace}")]
    AlreadyIndexed { namespace: String, filename: String },

    /// Filename is not indexed in the namespace
    #[error("Image {filename} is not indexed in {namespace}")]
    NotFound { namespace: String, filename: String },

    /// Same filename twice in one batch
    #[error("Duplicate filename in batch: {0}")]
    DuplicateInBatch(String),

    /// Invalid storage or index name
    #[error(transparent)]
    Name(#[from] CbirError),

    /// Invalid request argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metadata store error
    #[error("Metadata store error: {0}")]
    Store(#[from] StorageError),

    /// Vector index error
    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),

    /// The in-memory index changed but could not be written to disk
    #[error("Failed to persist index {namespace}: {source}")]
    Persist {
        namespace: String,
        #[source]
        source: IndexError,
    },

    /// Feature extraction error
    #[error("Feature error: {0}")]
    Features(#[from] FeatureError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding a namespace lock
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl RetrievalError {
    /// Whether the same request may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::Store(e) => matches!(e, StorageError::RocksDb(_)),
            RetrievalError::Persist { .. } => true,
            _ => false,
        }
    }
}
