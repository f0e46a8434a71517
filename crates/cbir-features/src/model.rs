//! Feature extractor trait and types.

use crate::error::FeatureError;

/// A fixed-length image descriptor.
///
/// Values are kept as produced by the extractor. Distances between
/// descriptors are squared Euclidean, so no normalization is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub values: Vec<f32>,
}

impl Features {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Check length against `expected` and reject non-finite values.
    pub fn validate(&self, expected: usize) -> Result<(), FeatureError> {
        if self.dimension() != expected {
            return Err(FeatureError::DimensionMismatch {
                expected,
                actual: self.dimension(),
            });
        }
        match self.values.iter().position(|v| !v.is_finite()) {
            Some(pos) => Err(FeatureError::NonFinite(pos)),
            None => Ok(()),
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for Features {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Extractor information
#[derive(Debug, Clone)]
pub struct ExtractorInfo {
    /// Extractor name (e.g., "resnet50", "f32le")
    pub name: String,
    /// Length of every produced vector
    pub n_features: usize,
}

/// Trait for feature extractors.
///
/// Implementations must be thread-safe (Send + Sync) and carry their own
/// model state; the coordinator never reaches for a global model.
pub trait FeatureExtractor: Send + Sync {
    fn info(&self) -> &ExtractorInfo;

    /// Produce the descriptor of one image.
    fn extract(&self, image: &[u8]) -> Result<Features, FeatureError>;

    /// Produce descriptors for several images.
    /// Default implementation calls extract() for each image.
    fn extract_batch(&self, images: &[&[u8]]) -> Result<Vec<Features>, FeatureError> {
        images.iter().map(|image| self.extract(image)).collect()
    }
}
