//! Column family definitions for RocksDB.
//!
//! Each column family holds one kind of metadata entry:
//! - filenames: `{storage}:{index}:{filename}` -> id
//! - labels: `{storage}:{index}:{id:020}` -> filename
//! - counters: `{storage}:{index}:last_id` -> next unallocated id

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for filename -> id entries
pub const CF_FILENAMES: &str = "filenames";

/// Column family name for id -> filename entries
pub const CF_LABELS: &str = "labels";

/// Column family name for per-namespace id counters
pub const CF_COUNTERS: &str = "counters";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_FILENAMES, CF_LABELS, CF_COUNTERS];

/// Create column family options for the mapping tables (Zstd at the bottommost level)
fn mapping_options() -> Options {
    let mut opts = Options::default();
    opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_FILENAMES, mapping_options()),
        ColumnFamilyDescriptor::new(CF_LABELS, mapping_options()),
        ColumnFamilyDescriptor::new(CF_COUNTERS, Options::default()),
    ]
}
