//! Feature extraction error types.

use thiserror::Error;

/// Errors that can occur while producing a feature vector.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Payload could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector length does not match the configured feature count
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector holds NaN or infinity
    #[error("Non-finite value at position {0}")]
    NonFinite(usize),

    /// JSON payload error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
