//! Namespace identity.
//!
//! A namespace is a `(storage, index)` pair. The storage name selects a
//! directory under the data path, the index name selects the index file inside
//! it, and `"{storage}:{index}:"` prefixes every metadata key of the namespace.
//!
//! Names may not contain `:`, so the key prefix of one namespace is never a
//! prefix of another's. Names may not contain path separators or start with
//! `.`, so they always resolve to a direct child of their parent directory.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CbirError;

/// Maximum length of a storage or index name in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Which part of a namespace a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Storage,
    Index,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Storage => f.write_str("storage"),
            NameKind::Index => f.write_str("index"),
        }
    }
}

/// Validate a storage or index name.
pub fn validate_name(kind: NameKind, name: &str) -> Result<(), CbirError> {
    let reject = |reason| {
        Err(CbirError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("name is longer than 255 bytes");
    }
    if name.starts_with('.') {
        return reject("name may not start with '.'");
    }
    if name.contains([':', '/', '\\', '\0']) {
        return reject("name may not contain ':', '/', '\\' or NUL");
    }
    Ok(())
}

/// A validated `(storage, index)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    storage: String,
    index: String,
}

impl Namespace {
    /// Build a namespace, validating both names.
    pub fn new(storage: impl Into<String>, index: impl Into<String>) -> Result<Self, CbirError> {
        let storage = storage.into();
        let index = index.into();
        validate_name(NameKind::Storage, &storage)?;
        validate_name(NameKind::Index, &index)?;
        Ok(Self { storage, index })
    }

    pub fn storage(&self) -> &str {
        &self.storage
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Metadata key prefix: `"{storage}:{index}:"`
    pub fn key_prefix(&self) -> String {
        format!("{}:{}:", self.storage, self.index)
    }

    /// Metadata key prefix covering every namespace of a storage.
    pub fn storage_prefix(storage: &str) -> String {
        format!("{}:", storage)
    }

    /// Directory holding every index file of this namespace's storage.
    pub fn storage_dir(&self, data_path: &Path) -> PathBuf {
        data_path.join(&self.storage)
    }

    /// Location of the serialized vector index.
    pub fn index_file(&self, data_path: &Path) -> PathBuf {
        self.storage_dir(data_path).join(&self.index)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.storage, self.index)
    }
}
