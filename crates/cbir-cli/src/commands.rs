//! Command implementations.
//!
//! Every command loads settings, opens the metadata store, builds a
//! retrieval facade and prints the result as JSON on stdout. Logs go to
//! stderr.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use cbir_features::VectorDecoder;
use cbir_index::{HandleCache, HnswConfig};
use cbir_retrieval::{IndexCoordinator, RetrievalFacade};
use cbir_storage::{MetadataStore, RocksStore};
use cbir_types::Settings;

use crate::cli::{Cli, Commands, StorageCommands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(data_path) = &cli.data_path {
        settings.data_path = data_path.clone();
    }
    if let Some(db_path) = &cli.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    Ok(settings)
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the metadata store and wire up the facade described by `settings`.
pub fn build_facade(settings: &Settings) -> Result<RetrievalFacade> {
    let db_path = settings.expanded_db_path();
    let data_path = settings.expanded_data_path();
    info!("Opening metadata store at {:?}", db_path);

    fs::create_dir_all(&db_path).context("Failed to create metadata directory")?;
    let store = RocksStore::open(&db_path).context("Failed to open metadata store")?;

    let handles = HandleCache::new(
        data_path,
        HnswConfig::from_settings(settings),
        settings.cache_capacity,
    );
    let coordinator = IndexCoordinator::new(handles, MetadataStore::new(Arc::new(store)));
    let extractor = VectorDecoder::new(settings.n_features, settings.features.encoding);

    Ok(RetrievalFacade::new(
        Arc::new(coordinator),
        Arc::new(extractor),
    ))
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;
    debug!("  Data path: {}", settings.data_path);
    debug!("  Features: {} ({:?})", settings.n_features, settings.features.encoding);

    let facade = build_facade(&settings)?;
    execute(&facade, cli.command).await
}

async fn execute(facade: &RetrievalFacade, command: Commands) -> Result<()> {
    match command {
        Commands::Storage(StorageCommands::Create { name }) => {
            print_json(&facade.create_storage(&name).await?)
        }
        Commands::Storage(StorageCommands::List) => print_json(&facade.list_storages().await?),
        Commands::Storage(StorageCommands::Show { name }) => {
            print_json(&facade.get_storage(&name).await?)
        }
        Commands::Storage(StorageCommands::Delete { name }) => {
            print_json(&facade.delete_storage(&name).await?)
        }
        Commands::Index { namespace, files } => {
            let mut images = Vec::with_capacity(files.len());
            for path in &files {
                images.push((file_name(path)?, read_payload(path)?));
            }
            let indexed = facade
                .index_images(&namespace.storage, &namespace.index, images)
                .await?;
            print_json(&indexed)
        }
        Commands::Remove {
            namespace,
            filename,
        } => {
            let removed = facade
                .remove_image(&namespace.storage, &namespace.index, &filename)
                .await?;
            print_json(&removed)
        }
        Commands::Search { namespace, file, k } => {
            let found = facade
                .search(&namespace.storage, &namespace.index, read_payload(&file)?, k)
                .await?;
            print_json(&found)
        }
        Commands::Stats { namespace } => {
            print_json(&facade.stats(&namespace.storage, &namespace.index).await?)
        }
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("Invalid payload file name: {:?}", path))
}

fn read_payload(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbir_types::FeatureEncoding;
    use tempfile::TempDir;

    fn settings(temp: &TempDir) -> Settings {
        Settings {
            data_path: temp.path().join("storages").to_string_lossy().into_owned(),
            db_path: temp.path().join("metadata").to_string_lossy().into_owned(),
            n_features: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/a/b.f32")).unwrap(), "b.f32");
        assert!(file_name(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_execute_index_and_search() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings(&temp);
        settings.features.encoding = FeatureEncoding::Json;
        let facade = build_facade(&settings).unwrap();

        let payload = temp.path().join("a.json");
        fs::write(&payload, b"[1.0, 0.5]").unwrap();

        execute(
            &facade,
            Commands::Storage(StorageCommands::Create {
                name: "slides".to_string(),
            }),
        )
        .await
        .unwrap();

        let namespace = crate::cli::NamespaceArgs {
            storage: "slides".to_string(),
            index: "index".to_string(),
        };
        execute(
            &facade,
            Commands::Index {
                namespace: namespace.clone(),
                files: vec![payload.clone()],
            },
        )
        .await
        .unwrap();

        let found = facade
            .search("slides", "index", b"[1.0, 0.5]".to_vec(), 1)
            .await
            .unwrap();
        assert_eq!(found.filenames, vec!["a.json"]);

        let missing = execute(
            &facade,
            Commands::Remove {
                namespace,
                filename: "b.json".to_string(),
            },
        )
        .await;
        assert!(missing.is_err());
    }
}
