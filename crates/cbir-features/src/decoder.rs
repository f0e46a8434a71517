//! Decoder for pre-extracted feature vectors.
//!
//! Accepts either raw little-endian `f32` values or a JSON array of numbers.

use cbir_types::FeatureEncoding;
use tracing::debug;

use crate::error::FeatureError;
use crate::model::{ExtractorInfo, FeatureExtractor, Features};

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// [`FeatureExtractor`] that reads the vector straight out of the payload.
#[derive(Debug, Clone)]
pub struct VectorDecoder {
    info: ExtractorInfo,
    encoding: FeatureEncoding,
}

impl VectorDecoder {
    pub fn new(n_features: usize, encoding: FeatureEncoding) -> Self {
        let name = match encoding {
            FeatureEncoding::F32Le => "f32le",
            FeatureEncoding::Json => "json",
        };
        Self {
            info: ExtractorInfo {
                name: name.to_string(),
                n_features,
            },
            encoding,
        }
    }

    pub fn encoding(&self) -> FeatureEncoding {
        self.encoding
    }

    fn decode_f32le(payload: &[u8]) -> Result<Vec<f32>, FeatureError> {
        if payload.len() % F32_SIZE != 0 {
            return Err(FeatureError::InvalidInput(format!(
                "payload of {} bytes is not a whole number of f32 values",
                payload.len()
            )));
        }
        Ok(payload
            .chunks_exact(F32_SIZE)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn decode_json(payload: &[u8]) -> Result<Vec<f32>, FeatureError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl FeatureExtractor for VectorDecoder {
    fn info(&self) -> &ExtractorInfo {
        &self.info
    }

    fn extract(&self, image: &[u8]) -> Result<Features, FeatureError> {
        if image.is_empty() {
            return Err(FeatureError::InvalidInput("empty payload".to_string()));
        }
        let values = match self.encoding {
            FeatureEncoding::F32Le => Self::decode_f32le(image)?,
            FeatureEncoding::Json => Self::decode_json(image)?,
        };
        let features = Features::new(values);
        features.validate(self.info.n_features)?;
        debug!(encoding = %self.info.name, dim = features.dimension(), "Decoded feature vector");
        Ok(features)
    }
}
