//! # cbir-types
//!
//! Shared types for the content-based image retrieval (CBIR) index
//! coordinator.
//!
//! - [`Namespace`]: the `(storage, index)` pair that scopes one vector index,
//!   its id counter and its metadata keys
//! - [`Settings`]: layered configuration (defaults, config file, env, CLI)
//! - [`CbirError`]: configuration and name validation failures

pub mod config;
pub mod error;
pub mod namespace;

pub use config::{FeatureEncoding, FeatureSettings, IndexSettings, Settings};
pub use error::CbirError;
pub use namespace::{validate_name, NameKind, Namespace};
