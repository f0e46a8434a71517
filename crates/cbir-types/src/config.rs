//! Configuration loading for the CBIR coordinator.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/cbir/config.toml`; environment
//! variables use the `CBIR_` prefix with `__` between nested keys
//! (`CBIR_N_FEATURES`, `CBIR_INDEX__CONNECTIVITY`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CbirError;

/// How pre-extracted feature payloads are encoded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureEncoding {
    /// Packed little-endian `f32` values
    #[default]
    F32Le,
    /// JSON array of numbers
    Json,
}

/// Feature extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeatureSettings {
    /// Payload encoding accepted by the extractor
    #[serde(default)]
    pub encoding: FeatureEncoding,
}

/// HNSW parameters applied to newly created indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Connections per graph layer (M)
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,

    /// Build-time search depth (ef_construction)
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,

    /// Query-time search depth (ef_search)
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,

    /// Slots reserved when an index is created or grows
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

fn default_connectivity() -> usize {
    16
}

fn default_expansion_add() -> usize {
    200
}

fn default_expansion_search() -> usize {
    100
}

fn default_initial_capacity() -> usize {
    1024
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            connectivity: default_connectivity(),
            expansion_add: default_expansion_add(),
            expansion_search: default_expansion_search(),
            initial_capacity: default_initial_capacity(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory; one sub-directory per storage
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Path to the RocksDB metadata store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Dimensionality of extracted feature vectors
    #[serde(default = "default_n_features")]
    pub n_features: usize,

    /// Maximum number of vector indexes kept open in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HNSW parameters
    #[serde(default)]
    pub index: IndexSettings,

    /// Feature extractor settings
    #[serde(default)]
    pub features: FeatureSettings,
}

fn default_data_path() -> String {
    ProjectDirs::from("", "", "cbir")
        .map(|p| p.data_local_dir().join("storages"))
        .unwrap_or_else(|| PathBuf::from("./storages"))
        .to_string_lossy()
        .to_string()
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "cbir")
        .map(|p| p.data_local_dir().join("metadata"))
        .unwrap_or_else(|| PathBuf::from("./metadata"))
        .to_string_lossy()
        .to_string()
}

fn default_n_features() -> usize {
    128
}

fn default_cache_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            db_path: default_db_path(),
            n_features: default_n_features(),
            cache_capacity: default_cache_capacity(),
            log_level: default_log_level(),
            index: IndexSettings::default(),
            features: FeatureSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/cbir/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CBIR_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CbirError> {
        let config_dir = ProjectDirs::from("", "", "cbir")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_path", default_data_path())
            .map_err(|e| CbirError::Config(e.to_string()))?
            .set_default("db_path", default_db_path())
            .map_err(|e| CbirError::Config(e.to_string()))?
            .set_default("n_features", default_n_features() as i64)
            .map_err(|e| CbirError::Config(e.to_string()))?
            .set_default("cache_capacity", default_cache_capacity() as i64)
            .map_err(|e| CbirError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CbirError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CBIR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CbirError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CbirError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CbirError> {
        if self.n_features == 0 {
            return Err(CbirError::Config("n_features must be > 0".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(CbirError::Config("cache_capacity must be > 0".to_string()));
        }
        if self.index.connectivity < 2 {
            return Err(CbirError::Config(format!(
                "index.connectivity must be >= 2, got {}",
                self.index.connectivity
            )));
        }
        if self.index.initial_capacity == 0 {
            return Err(CbirError::Config(
                "index.initial_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage root with `~` expanded.
    pub fn expanded_data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_path).as_ref())
    }

    /// Metadata store path with `~` expanded.
    pub fn expanded_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).as_ref())
    }
}
