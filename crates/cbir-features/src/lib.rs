//! # cbir-features
//!
//! Feature vectors for the CBIR index coordinator.
//!
//! The model that turns an image into a descriptor is an external
//! collaborator. This crate defines the contract the coordinator relies on
//! ([`FeatureExtractor`]) and ships [`VectorDecoder`], an extractor for
//! deployments where descriptors are computed upstream and uploaded as raw
//! vectors.

pub mod decoder;
pub mod error;
pub mod model;

pub use decoder::VectorDecoder;
pub use error::FeatureError;
pub use model::{ExtractorInfo, FeatureExtractor, Features};
