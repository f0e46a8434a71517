//! RocksDB-backed metadata store.
//!
//! Provides:
//! - Database open with column family setup (one CF per keyspace)
//! - Single-key reads and writes
//! - Ordered prefix scans and batched prefix deletes

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES};
use crate::error::StorageError;
use crate::store::{KeyValueStore, Keyspace};

/// RocksDB implementation of [`KeyValueStore`]
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open the store at the given path, creating it if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening metadata store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(2);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }

    fn cf(&self, keyspace: Keyspace) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(keyspace.cf_name())
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(keyspace.cf_name().to_string()))
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<(String, String), StorageError> {
        let key = std::str::from_utf8(key)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let value = std::str::from_utf8(value).map_err(|_| StorageError::Corrupt {
            key: key.to_string(),
            value: String::from_utf8_lossy(value).into_owned(),
        })?;
        Ok((key.to_string(), value.to_string()))
    }
}

impl KeyValueStore for RocksStore {
    fn get(&self, keyspace: Keyspace, key: &str) -> Result<Option<String>, StorageError> {
        let cf = self.cf(keyspace)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => {
                let (_, value) = Self::decode(key.as_bytes(), &bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, keyspace: Keyspace, key: &str, value: &str) -> Result<(), StorageError> {
        let cf = self.cf(keyspace)?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        debug!(cf = keyspace.cf_name(), key = %key, "Stored metadata");
        Ok(())
    }

    fn delete(&self, keyspace: Keyspace, key: &str) -> Result<(), StorageError> {
        let cf = self.cf(keyspace)?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        keyspace: Keyspace,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StorageError> {
        let cf = self.cf(keyspace)?;
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            results.push(Self::decode(&key, &value)?);
        }
        Ok(results)
    }

    fn delete_prefix(&self, keyspace: Keyspace, prefix: &str) -> Result<usize, StorageError> {
        let cf = self.cf(keyspace)?;
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        let mut batch = WriteBatch::default();
        let mut count = 0;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            batch.delete_cf(cf, &key);
            count += 1;
        }

        if count > 0 {
            self.db.write(batch)?;
        }
        debug!(cf = keyspace.cf_name(), prefix = %prefix, count, "Deleted metadata by prefix");
        Ok(count)
    }

    fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }
}
