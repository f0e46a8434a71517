//! Key-value store contract.
//!
//! The metadata layer only needs string keys and string values spread over a
//! few keyspaces. Each call is independently durable once it returns; there
//! are no cross-call transactions.

use crate::column_families::{CF_COUNTERS, CF_FILENAMES, CF_LABELS};
use crate::error::StorageError;

/// Logical keyspace; maps to one RocksDB column family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyspace {
    /// filename -> id
    Filenames,
    /// id -> filename
    Labels,
    /// per-namespace id counters
    Counters,
}

impl Keyspace {
    pub const ALL: [Keyspace; 3] = [Keyspace::Filenames, Keyspace::Labels, Keyspace::Counters];

    pub fn cf_name(&self) -> &'static str {
        match self {
            Keyspace::Filenames => CF_FILENAMES,
            Keyspace::Labels => CF_LABELS,
            Keyspace::Counters => CF_COUNTERS,
        }
    }
}

/// Trait for metadata key-value stores.
///
/// Implementations must be thread-safe; callers that need read-modify-write
/// atomicity serialize through their own per-namespace lock.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, keyspace: Keyspace, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, keyspace: Keyspace, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting a missing key is not an error
    fn delete(&self, keyspace: Keyspace, key: &str) -> Result<(), StorageError>;

    /// Check whether `key` is present
    fn exists(&self, keyspace: Keyspace, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(keyspace, key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(
        &self,
        keyspace: Keyspace,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StorageError>;

    /// Delete every entry whose key starts with `prefix`.
    ///
    /// Returns the number of deleted entries.
    fn delete_prefix(&self, keyspace: Keyspace, prefix: &str) -> Result<usize, StorageError> {
        let entries = self.scan_prefix(keyspace, prefix)?;
        for (key, _) in &entries {
            self.delete(keyspace, key)?;
        }
        Ok(entries.len())
    }

    /// Flush buffered writes to durable storage
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
