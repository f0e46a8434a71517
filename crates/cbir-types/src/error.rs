//! Error types shared across the CBIR crates.

use thiserror::Error;

use crate::namespace::NameKind;

/// Configuration and validation errors.
#[derive(Debug, Error)]
pub enum CbirError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage or index name rejected by validation
    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: &'static str,
    },
}
