//! Retrieval facade.
//!
//! The boundary the HTTP layer consumes: validates names, runs feature
//! extraction and the coordinator on tokio's blocking pool, and maps
//! failures to status codes. Holds no state of its own.

use std::fmt;
use std::sync::Arc;

use cbir_features::FeatureExtractor;
use cbir_index::IndexError;
use cbir_storage::StorageError;
use cbir_types::Namespace;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::coordinator::{IndexCoordinator, NamespaceStats};
use crate::error::RetrievalError;

/// Response status of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    BadRequest,
    NotFound,
    Conflict,
    UnprocessableEntity,
    Internal,
    ServiceUnavailable,
}

impl StatusCode {
    /// HTTP status code
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::Conflict => 409,
            StatusCode::UnprocessableEntity => 422,
            StatusCode::Internal => 500,
            StatusCode::ServiceUnavailable => 503,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// A failed facade request.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{status}: {message}")]
pub struct FacadeError {
    pub status: StatusCode,
    pub message: String,
}

impl FacadeError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }

    /// Whether the client may retry the same request.
    pub fn is_retryable(&self) -> bool {
        self.status == StatusCode::ServiceUnavailable
    }
}

impl From<RetrievalError> for FacadeError {
    fn from(err: RetrievalError) -> Self {
        let status = match &err {
            RetrievalError::AlreadyIndexed { .. } | RetrievalError::StorageExists(_) => {
                StatusCode::Conflict
            }
            RetrievalError::NotFound { .. } | RetrievalError::StorageNotFound(_) => {
                StatusCode::NotFound
            }
            RetrievalError::Features(_)
            | RetrievalError::Index(IndexError::DimensionMismatch { .. }) => {
                StatusCode::UnprocessableEntity
            }
            RetrievalError::Name(_)
            | RetrievalError::InvalidArgument(_)
            | RetrievalError::DuplicateInBatch(_) => StatusCode::BadRequest,
            RetrievalError::Store(StorageError::RocksDb(_)) | RetrievalError::Persist { .. } => {
                StatusCode::ServiceUnavailable
            }
            RetrievalError::Store(_)
            | RetrievalError::Index(_)
            | RetrievalError::Io(_)
            | RetrievalError::LockPoisoned(_) => StatusCode::Internal,
        };
        Self::new(status, err.to_string())
    }
}

/// Ids assigned to newly indexed images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedImage {
    pub ids: Vec<u64>,
    pub storage: String,
    pub index: String,
}

/// Id freed by a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedImage {
    pub id: u64,
    pub storage: String,
    pub index: String,
}

/// Nearest images, closest first. `filenames[i]` is at `distances[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub filenames: Vec<String>,
    pub distances: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub name: String,
}

/// Async entry point for image retrieval.
#[derive(Clone)]
pub struct RetrievalFacade {
    coordinator: Arc<IndexCoordinator>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl RetrievalFacade {
    pub fn new(coordinator: Arc<IndexCoordinator>, extractor: Arc<dyn FeatureExtractor>) -> Self {
        Self {
            coordinator,
            extractor,
        }
    }

    pub fn coordinator(&self) -> &Arc<IndexCoordinator> {
        &self.coordinator
    }

    /// Index one image under `filename`.
    pub async fn index_image(
        &self,
        storage: &str,
        index: &str,
        filename: &str,
        image: Vec<u8>,
    ) -> Result<IndexedImage, FacadeError> {
        self.index_images(storage, index, vec![(filename.to_string(), image)])
            .await
    }

    /// Index several images under one contiguous id block.
    pub async fn index_images(
        &self,
        storage: &str,
        index: &str,
        images: Vec<(String, Vec<u8>)>,
    ) -> Result<IndexedImage, FacadeError> {
        let ns = namespace(storage, index)?;
        debug!(namespace = %ns, count = images.len(), "Index request");

        let ids = self
            .run(move |coordinator, extractor| {
                let mut batch = Vec::with_capacity(images.len());
                for (filename, image) in images {
                    batch.push((filename, extractor.extract(&image)?));
                }
                coordinator.index_images(&ns, batch)
            })
            .await?;

        Ok(IndexedImage {
            ids,
            storage: storage.to_string(),
            index: index.to_string(),
        })
    }

    /// Remove an indexed image; 404 if it was never indexed.
    pub async fn remove_image(
        &self,
        storage: &str,
        index: &str,
        filename: &str,
    ) -> Result<RemovedImage, FacadeError> {
        let ns = namespace(storage, index)?;
        let filename = filename.to_string();

        let id = self
            .run(move |coordinator, _| {
                coordinator
                    .remove_image(&ns, &filename)?
                    .ok_or_else(|| RetrievalError::NotFound {
                        namespace: ns.to_string(),
                        filename,
                    })
            })
            .await?;

        Ok(RemovedImage {
            id,
            storage: storage.to_string(),
            index: index.to_string(),
        })
    }

    /// The `k` indexed images most similar to `image`.
    pub async fn search(
        &self,
        storage: &str,
        index: &str,
        image: Vec<u8>,
        k: usize,
    ) -> Result<SearchResponse, FacadeError> {
        let ns = namespace(storage, index)?;

        let hits = self
            .run(move |coordinator, extractor| {
                let query = extractor.extract(&image)?;
                coordinator.search(&ns, &query, k)
            })
            .await?;

        let (filenames, distances) = hits
            .into_iter()
            .map(|hit| (hit.filename, hit.distance))
            .unzip();
        Ok(SearchResponse {
            filenames,
            distances,
        })
    }

    pub async fn stats(&self, storage: &str, index: &str) -> Result<NamespaceStats, FacadeError> {
        let ns = namespace(storage, index)?;
        self.run(move |coordinator, _| coordinator.stats(&ns)).await
    }

    pub async fn create_storage(&self, name: &str) -> Result<StorageInfo, FacadeError> {
        let owned = name.to_string();
        self.run(move |coordinator, _| coordinator.create_storage(&owned))
            .await?;
        Ok(StorageInfo {
            name: name.to_string(),
        })
    }

    pub async fn list_storages(&self) -> Result<Vec<String>, FacadeError> {
        self.run(|coordinator, _| coordinator.list_storages()).await
    }

    /// Look up one storage; 404 if it does not exist.
    pub async fn get_storage(&self, name: &str) -> Result<StorageInfo, FacadeError> {
        let owned = name.to_string();
        let exists = self
            .run(move |coordinator, _| coordinator.storage_exists(&owned))
            .await?;
        if !exists {
            return Err(RetrievalError::StorageNotFound(name.to_string()).into());
        }
        Ok(StorageInfo {
            name: name.to_string(),
        })
    }

    pub async fn delete_storage(&self, name: &str) -> Result<StorageInfo, FacadeError> {
        let owned = name.to_string();
        self.run(move |coordinator, _| coordinator.delete_storage(&owned))
            .await?;
        Ok(StorageInfo {
            name: name.to_string(),
        })
    }

    /// Run blocking coordinator work off the async runtime.
    async fn run<T, F>(&self, work: F) -> Result<T, FacadeError>
    where
        T: Send + 'static,
        F: FnOnce(&IndexCoordinator, &dyn FeatureExtractor) -> Result<T, RetrievalError>
            + Send
            + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || work(&coordinator, extractor.as_ref()))
            .await
            .map_err(|e| FacadeError::internal(format!("Task error: {}", e)))?
            .map_err(FacadeError::from)
    }
}

fn namespace(storage: &str, index: &str) -> Result<Namespace, FacadeError> {
    Namespace::new(storage, index).map_err(|e| RetrievalError::from(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbir_features::{FeatureError, VectorDecoder};
    use cbir_index::{HandleCache, HnswConfig};
    use cbir_storage::{MemoryStore, MetadataStore};
    use cbir_types::FeatureEncoding;
    use tempfile::TempDir;

    fn facade(temp: &TempDir) -> RetrievalFacade {
        let coordinator = IndexCoordinator::new(
            HandleCache::new(temp.path(), HnswConfig::new(2), 4),
            MetadataStore::new(Arc::new(MemoryStore::new())),
        );
        RetrievalFacade::new(
            Arc::new(coordinator),
            Arc::new(VectorDecoder::new(2, FeatureEncoding::Json)),
        )
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                RetrievalError::AlreadyIndexed {
                    namespace: "a/x".to_string(),
                    filename: "f".to_string(),
                },
                409,
            ),
            (RetrievalError::StorageNotFound("a".to_string()), 404),
            (
                RetrievalError::Features(FeatureError::DimensionMismatch {
                    expected: 2,
                    actual: 3,
                }),
                422,
            ),
            (
                RetrievalError::Index(IndexError::DimensionMismatch {
                    expected: 2,
                    actual: 3,
                }),
                422,
            ),
            (RetrievalError::InvalidArgument("k".to_string()), 400),
            (
                RetrievalError::Persist {
                    namespace: "a/x".to_string(),
                    source: IndexError::Engine("disk full".to_string()),
                },
                503,
            ),
            (
                RetrievalError::Index(IndexError::Corrupt {
                    path: "a/x".into(),
                    reason: "bad header".to_string(),
                }),
                500,
            ),
        ];
        for (err, code) in cases {
            let facade_err = FacadeError::from(err);
            assert_eq!(facade_err.status.as_u16(), code, "{}", facade_err.message);
            assert_eq!(facade_err.is_retryable(), code == 503);
        }
    }

    #[tokio::test]
    async fn test_index_search_remove() {
        let temp = TempDir::new().unwrap();
        let facade = facade(&temp);
        facade.create_storage("s").await.unwrap();

        let indexed = facade
            .index_image("s", "x", "a.png", b"[1.0, 2.0]".to_vec())
            .await
            .unwrap();
        assert_eq!(indexed.ids, vec![0]);
        assert_eq!(indexed.storage, "s");
        assert_eq!(indexed.index, "x");

        let found = facade
            .search("s", "x", b"[1.0, 2.0]".to_vec(), 3)
            .await
            .unwrap();
        assert_eq!(found.filenames, vec!["a.png"]);
        assert_eq!(found.distances, vec![0.0]);

        let removed = facade.remove_image("s", "x", "a.png").await.unwrap();
        assert_eq!(removed.id, 0);

        let err = facade.remove_image("s", "x", "a.png").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let temp = TempDir::new().unwrap();
        let facade = facade(&temp);

        let err = facade
            .index_image("missing", "x", "a.png", b"[1.0, 2.0]".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NotFound);

        facade.create_storage("s").await.unwrap();
        let err = facade.create_storage("s").await.unwrap_err();
        assert_eq!(err.status, StatusCode::Conflict);

        let err = facade
            .index_image("s", "x", "a.png", b"[1.0]".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UnprocessableEntity);

        let err = facade
            .search("s", "x", b"[1.0, 2.0]".to_vec(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);

        let err = facade
            .index_image("s:x", "x", "a.png", b"[1.0, 2.0]".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);

        facade
            .index_image("s", "x", "a.png", b"[1.0, 2.0]".to_vec())
            .await
            .unwrap();
        let err = facade
            .index_image("s", "x", "a.png", b"[3.0, 4.0]".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::Conflict);
    }

    #[tokio::test]
    async fn test_storage_lifecycle() {
        let temp = TempDir::new().unwrap();
        let facade = facade(&temp);

        assert_eq!(
            facade.get_storage("s").await.unwrap_err().status,
            StatusCode::NotFound
        );
        facade.create_storage("s").await.unwrap();
        assert_eq!(facade.list_storages().await.unwrap(), vec!["s"]);
        assert_eq!(facade.get_storage("s").await.unwrap().name, "s");

        facade.delete_storage("s").await.unwrap();
        assert!(facade.list_storages().await.unwrap().is_empty());
        assert_eq!(
            facade.delete_storage("s").await.unwrap_err().status,
            StatusCode::NotFound
        );
    }

    #[test]
    fn test_response_serialization() {
        let response = SearchResponse {
            filenames: vec!["a.png".to_string()],
            distances: vec![0.5],
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"filenames":["a.png"],"distances":[0.5]}"#
        );
    }
}
