//! Integration tests for the index coordinator.
//!
//! These tests run the coordinator against RocksDB metadata and on-disk
//! HNSW indexes, including process restarts over the same directories.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rand::Rng;
use tempfile::TempDir;

use cbir_features::Features;
use cbir_index::{HandleCache, HnswConfig, VectorIndexHandle};
use cbir_retrieval::{IndexCoordinator, RetrievalError};
use cbir_storage::{MetadataStore, RocksStore};
use cbir_types::Namespace;

const DIM: usize = 16;

/// Test harness owning the data and metadata directories.
struct TestHarness {
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn data_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("storages")
    }

    /// Open a coordinator as a fresh process would.
    fn open(&self) -> IndexCoordinator {
        let store = RocksStore::open(&self.temp_dir.path().join("metadata"))
            .expect("Failed to open metadata store");
        IndexCoordinator::new(
            HandleCache::new(self.data_path(), HnswConfig::new(DIM), 8),
            MetadataStore::new(Arc::new(store)),
        )
    }
}

fn random_features() -> Features {
    let mut rng = rand::rng();
    Features::new((0..DIM).map(|_| rng.random::<f32>()).collect())
}

fn namespace(coord: &IndexCoordinator, storage: &str, index: &str) -> Namespace {
    if !coord.storage_exists(storage).unwrap() {
        coord.create_storage(storage).unwrap();
    }
    Namespace::new(storage, index).unwrap()
}

#[test]
fn test_indexed_image_is_its_own_nearest_neighbor() {
    let harness = TestHarness::new();
    let coord = harness.open();
    let ns = namespace(&coord, "slides", "main");

    let v = random_features();
    coord.index_image(&ns, "a.png", v.clone()).unwrap();

    let hits = coord.search(&ns, &v, 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "a.png");
    assert!(hits[0].distance.abs() < 1e-5);

    for i in 0..10 {
        coord
            .index_image(&ns, &format!("other-{}.png", i), random_features())
            .unwrap();
    }
    let hits = coord.search(&ns, &v, 1).unwrap();
    assert_eq!(hits[0].filename, "a.png");
    assert!(hits[0].distance.abs() < 1e-5);
}

#[test]
fn test_duplicate_filename_leaves_index_unchanged() {
    let harness = TestHarness::new();
    let coord = harness.open();
    let ns = namespace(&coord, "slides", "main");

    coord.index_image(&ns, "a.png", random_features()).unwrap();
    let before = coord.stats(&ns).unwrap();

    let result = coord.index_image(&ns, "a.png", random_features());
    assert!(matches!(result, Err(RetrievalError::AlreadyIndexed { .. })));
    assert_eq!(coord.stats(&ns).unwrap(), before);
}

#[test]
fn test_remove_image() {
    let harness = TestHarness::new();
    let coord = harness.open();
    let ns = namespace(&coord, "slides", "main");

    let kept = random_features();
    let removed = random_features();
    coord.index_image(&ns, "kept.png", kept).unwrap();
    coord.index_image(&ns, "gone.png", removed.clone()).unwrap();

    let before = coord.stats(&ns).unwrap();
    assert_eq!(coord.remove_image(&ns, "never.png").unwrap(), None);
    assert_eq!(coord.stats(&ns).unwrap(), before);

    assert_eq!(coord.remove_image(&ns, "gone.png").unwrap(), Some(1));
    assert_eq!(coord.stats(&ns).unwrap().entries, before.entries - 1);

    let hits = coord.search(&ns, &removed, 10).unwrap();
    assert!(hits.iter().all(|hit| hit.filename != "gone.png"));
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_ids_are_never_reused() {
    let harness = TestHarness::new();
    {
        let coord = harness.open();
        let ns = namespace(&coord, "slides", "main");
        assert_eq!(coord.index_image(&ns, "1.png", random_features()).unwrap(), 0);
        assert_eq!(coord.index_image(&ns, "2.png", random_features()).unwrap(), 1);
        assert_eq!(coord.index_image(&ns, "3.png", random_features()).unwrap(), 2);
        assert_eq!(coord.remove_image(&ns, "2.png").unwrap(), Some(1));
        assert_eq!(coord.index_image(&ns, "4.png", random_features()).unwrap(), 3);
    }

    // Restart over the same state.
    let coord = harness.open();
    let ns = Namespace::new("slides", "main").unwrap();
    assert_eq!(coord.index_image(&ns, "5.png", random_features()).unwrap(), 4);
    assert_eq!(coord.index_image(&ns, "2.png", random_features()).unwrap(), 5);

    let stats = coord.stats(&ns).unwrap();
    assert_eq!(stats.entries, 5);
    assert_eq!(stats.last_id, 6);
}

#[test]
fn test_search_beyond_index_size() {
    let harness = TestHarness::new();
    let coord = harness.open();
    let ns = namespace(&coord, "slides", "main");

    for i in 0..3 {
        coord
            .index_image(&ns, &format!("{}.png", i), random_features())
            .unwrap();
    }

    let hits = coord.search(&ns, &random_features(), 10).unwrap();
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let empty = namespace(&coord, "slides", "empty");
    assert!(coord.search(&empty, &random_features(), 5).unwrap().is_empty());
}

#[test]
fn test_reload_gives_identical_results() {
    let harness = TestHarness::new();
    let query = random_features();
    let (ns, before) = {
        let coord = harness.open();
        let ns = namespace(&coord, "slides", "main");
        for i in 0..20 {
            coord
                .index_image(&ns, &format!("{}.png", i), random_features())
                .unwrap();
        }
        let before = coord.search(&ns, &query, 5).unwrap();
        (ns, before)
    };
    assert_eq!(before.len(), 5);

    let coord = harness.open();
    let after = coord.search(&ns, &query, 5).unwrap();
    assert_eq!(after, before);

    let path = ns.index_file(&harness.data_path());
    let distances: Vec<f32> = open_and_search(&ns, &path, &query)
        .iter()
        .map(|n| n.distance)
        .collect();
    let expected: Vec<f32> = before.iter().map(|hit| hit.distance).collect();
    assert_eq!(distances, expected);
}

fn open_and_search(ns: &Namespace, path: &Path, query: &Features) -> Vec<cbir_index::Neighbor> {
    let handle = VectorIndexHandle::open(ns.clone(), path.to_path_buf(), HnswConfig::new(DIM))
        .expect("Failed to reopen index");
    handle.search(query, 5).unwrap()
}

#[test]
fn test_namespaces_do_not_collide() {
    let harness = TestHarness::new();
    let coord = harness.open();
    let x = namespace(&coord, "a", "x");
    let y = namespace(&coord, "a", "y");
    let other_storage = namespace(&coord, "ab", "x");

    coord.index_image(&x, "f.png", random_features()).unwrap();

    assert!(coord.contains(&x, "f.png").unwrap());
    assert!(!coord.contains(&y, "f.png").unwrap());
    assert!(!coord.contains(&other_storage, "f.png").unwrap());

    assert_eq!(coord.index_image(&y, "f.png", random_features()).unwrap(), 0);
}

#[test]
fn test_concurrent_indexing_in_one_namespace() {
    let harness = TestHarness::new();
    let coord = Arc::new(harness.open());
    let ns = namespace(&coord, "slides", "main");

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let coord = Arc::clone(&coord);
            let ns = ns.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|i| {
                        coord
                            .index_image(&ns, &format!("{}-{}.png", worker, i), random_features())
                            .unwrap()
                    })
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..40).collect::<Vec<u64>>());

    let stats = coord.stats(&ns).unwrap();
    assert_eq!(stats.entries, 40);
    assert_eq!(stats.vectors, 40);
    assert_eq!(stats.last_id, 40);
}
