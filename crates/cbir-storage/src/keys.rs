//! Key encoding and decoding for the metadata store.
//!
//! Every key starts with the namespace prefix `{storage}:{index}:`:
//! - filename entries: `{storage}:{index}:{filename}`
//! - label entries: `{storage}:{index}:{id:020}` (zero-padded so a prefix scan
//!   yields ids in ascending order)
//! - counter entry: `{storage}:{index}:last_id`

use cbir_types::Namespace;

use crate::error::StorageError;

/// Suffix of the per-namespace counter key
pub const LAST_ID: &str = "last_id";

/// Key for a filename -> id entry
/// Format: {storage}:{index}:{filename}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameKey<'a> {
    pub namespace: &'a Namespace,
    pub filename: &'a str,
}

impl<'a> FilenameKey<'a> {
    pub fn new(namespace: &'a Namespace, filename: &'a str) -> Self {
        Self {
            namespace,
            filename,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{}", self.namespace.key_prefix(), self.filename)
    }

    /// Extract the filename from an encoded key of `namespace`.
    pub fn decode_filename<'k>(namespace: &Namespace, key: &'k str) -> Result<&'k str, StorageError> {
        key.strip_prefix(&namespace.key_prefix())
            .ok_or_else(|| StorageError::Key(format!("Key {} outside {}", key, namespace)))
    }
}

/// Key for an id -> filename entry
/// Format: {storage}:{index}:{id:020}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelKey<'a> {
    pub namespace: &'a Namespace,
    pub id: u64,
}

impl<'a> LabelKey<'a> {
    pub fn new(namespace: &'a Namespace, id: u64) -> Self {
        Self { namespace, id }
    }

    pub fn encode(&self) -> String {
        format!("{}{:020}", self.namespace.key_prefix(), self.id)
    }

    /// Extract the id from an encoded key of `namespace`.
    pub fn decode_id(namespace: &Namespace, key: &str) -> Result<u64, StorageError> {
        let raw = key
            .strip_prefix(&namespace.key_prefix())
            .ok_or_else(|| StorageError::Key(format!("Key {} outside {}", key, namespace)))?;
        raw.parse()
            .map_err(|e| StorageError::Key(format!("Invalid id in label key {}: {}", key, e)))
    }
}

/// Key for the per-namespace id counter
/// Format: {storage}:{index}:last_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterKey<'a> {
    pub namespace: &'a Namespace,
}

impl<'a> CounterKey<'a> {
    pub fn new(namespace: &'a Namespace) -> Self {
        Self { namespace }
    }

    pub fn encode(&self) -> String {
        format!("{}{}", self.namespace.key_prefix(), LAST_ID)
    }
}

/// Parse a stored decimal id.
pub fn parse_id(key: &str, value: &str) -> Result<u64, StorageError> {
    value.parse().map_err(|_| StorageError::Corrupt {
        key: key.to_string(),
        value: value.to_string(),
    })
}
