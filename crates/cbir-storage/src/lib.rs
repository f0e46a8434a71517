//! Metadata layer for the CBIR index coordinator.
//!
//! Provides:
//! - A key-value contract ([`KeyValueStore`]) with RocksDB and in-memory
//!   implementations, one column family per [`Keyspace`]
//! - Namespace-scoped key encoding (`"{storage}:{index}:..."`)
//! - Typed filename <-> id bookkeeping ([`MetadataStore`])
//! - Monotonic per-namespace id allocation ([`IdAllocator`])

pub mod allocator;
pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod metadata;
pub mod store;

pub use allocator::{IdAllocator, IdBlock};
pub use db::RocksStore;
pub use error::StorageError;
pub use keys::{CounterKey, FilenameKey, LabelKey};
pub use memory::MemoryStore;
pub use metadata::MetadataStore;
pub use store::{KeyValueStore, Keyspace};
