//! CBIR CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations over the retrieval facade

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, NamespaceArgs, StorageCommands};
pub use commands::{build_facade, load_settings, run};
