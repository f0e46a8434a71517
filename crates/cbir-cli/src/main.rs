//! CBIR operator CLI
//!
//! Manages storages and indexes images offline, against the same data and
//! metadata directories a serving process uses.
//!
//! # Usage
//!
//! ```bash
//! cbir storage create slides
//! cbir index --storage slides a.f32 b.f32
//! cbir search --storage slides query.f32 -k 5
//! cbir remove --storage slides a.f32
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/cbir/config.toml, or --config)
//! 3. Environment variables (CBIR_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use cbir_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
