//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the metadata layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Stored value could not be decoded
    #[error("Corrupt value for key {key}: {value:?}")]
    Corrupt { key: String, value: String },

    /// Attempt to move an id counter backwards
    #[error("Id counter for {namespace} would regress from {current} to {requested}")]
    CounterRegression {
        namespace: String,
        current: u64,
        requested: u64,
    },

    /// No ids left in the namespace
    #[error("Id space exhausted for {0}")]
    IdSpaceExhausted(String),
}
