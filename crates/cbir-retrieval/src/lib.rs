//! # cbir-retrieval
//!
//! Index lifecycle and metadata consistency for content-based image
//! retrieval.
//!
//! - [`IndexCoordinator`]: orchestrates the id allocator, the vector index
//!   handle and the metadata store for index, remove and search, and manages
//!   storages
//! - [`RetrievalFacade`]: async boundary consumed by the HTTP layer; maps
//!   coordinator errors to status codes

pub mod coordinator;
pub mod error;
pub mod facade;
pub mod storages;

pub use coordinator::{IndexCoordinator, NamespaceStats, SearchHit};
pub use error::RetrievalError;
pub use facade::{
    FacadeError, IndexedImage, RemovedImage, RetrievalFacade, SearchResponse, StatusCode,
    StorageInfo,
};
