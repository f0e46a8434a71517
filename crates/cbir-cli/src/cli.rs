//! CLI argument parsing.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Content-based image retrieval
///
/// Index image descriptors into named nearest-neighbor indexes and query them.
#[derive(Parser, Debug)]
#[command(name = "cbir")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/cbir/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the directory holding storages
    #[arg(long, global = true)]
    pub data_path: Option<String>,

    /// Override the metadata database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Namespace selection shared by image commands
#[derive(Args, Debug, Clone)]
pub struct NamespaceArgs {
    /// Storage name
    #[arg(short, long)]
    pub storage: String,

    /// Index name within the storage
    #[arg(short, long, default_value = "index")]
    pub index: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storages
    #[command(subcommand)]
    Storage(StorageCommands),

    /// Index image payloads; each is stored under its file name
    Index {
        #[command(flatten)]
        namespace: NamespaceArgs,

        /// Payload files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove an indexed image
    Remove {
        #[command(flatten)]
        namespace: NamespaceArgs,

        /// Filename the image was indexed under
        filename: String,
    },

    /// Find the images most similar to a query payload
    Search {
        #[command(flatten)]
        namespace: NamespaceArgs,

        /// Query payload file
        file: PathBuf,

        /// Number of neighbors
        #[arg(short, long, default_value = "10")]
        k: usize,
    },

    /// Show namespace counters
    Stats {
        #[command(flatten)]
        namespace: NamespaceArgs,
    },
}

/// Storage subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StorageCommands {
    /// Create an empty storage
    Create { name: String },

    /// List storages
    List,

    /// Check that a storage exists
    Show { name: String },

    /// Delete a storage with its indexes and metadata
    Delete { name: String },
}
