//! Sink writer: CSV-encode the aggregate and write it to object storage.
//!
//! Storage goes through `object_store`. A backend store is built per call and
//! dropped afterwards; async calls run on a current-thread tokio runtime so
//! the rest of the pipeline stays blocking.

use crate::config::{StorageConfig, StorageKind};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use sectorflow_core::{decode_csv, encode_csv, AggregateRow, ExportError};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SinkWriteError {
    #[error("storage backend setup failed: {0}")]
    Backend(String),

    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("write to {bucket}/{key} failed: {reason}")]
    Write {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("read of {bucket}/{key} failed: {reason}")]
    Read {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Codec(#[from] ExportError),
}

/// Blob write/read by bucket and key.
pub trait BlobStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    fn put(&self, bucket: &str, key: &str, body: String) -> Result<(), SinkWriteError>;

    fn get(&self, bucket: &str, key: &str) -> Result<String, SinkWriteError>;
}

/// Which object store serves a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Amazon S3 (credentials from the environment).
    S3 {
        region: Option<String>,
        endpoint: Option<String>,
    },
    /// `{root}/{bucket}/{key}` on the local filesystem.
    Local { root: PathBuf },
    /// Process-local store, one per bucket.
    Memory,
}

impl StorageBackend {
    pub fn from_config(config: &StorageConfig) -> Result<Self, SinkWriteError> {
        Ok(match config.kind {
            StorageKind::S3 => StorageBackend::S3 {
                region: config.region.clone(),
                endpoint: config.endpoint.clone(),
            },
            StorageKind::Local => StorageBackend::Local {
                root: config.root.clone().ok_or_else(|| {
                    SinkWriteError::Backend("local storage requires a root directory".into())
                })?,
            },
            StorageKind::Memory => StorageBackend::Memory,
        })
    }
}

/// [`BlobStore`] backed by `object_store`.
pub struct ObjectStoreBlobs {
    backend: StorageBackend,
    memory: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl ObjectStoreBlobs {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, SinkWriteError> {
        Ok(Self::new(StorageBackend::from_config(config)?))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, SinkWriteError> {
        let backend = |e: String| SinkWriteError::Backend(e);

        match &self.backend {
            StorageBackend::S3 { region, endpoint } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_virtual_hosted_style_request(false)
                        .with_allow_http(true);
                }
                let store = builder.build().map_err(|e| backend(e.to_string()))?;
                Ok(Arc::new(store))
            }
            StorageBackend::Local { root } => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir)
                    .map_err(|e| backend(format!("create {}: {e}", dir.display())))?;
                let store =
                    LocalFileSystem::new_with_prefix(&dir).map_err(|e| backend(e.to_string()))?;
                Ok(Arc::new(store))
            }
            StorageBackend::Memory => {
                let mut stores = self
                    .memory
                    .lock()
                    .map_err(|_| backend("memory store lock poisoned".into()))?;
                let store = stores
                    .entry(bucket.to_string())
                    .or_insert_with(|| Arc::new(InMemory::new()))
                    .clone();
                Ok(store)
            }
        }
    }

    fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, SinkWriteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SinkWriteError::Backend(format!("tokio runtime: {e}")))?;
        Ok(runtime.block_on(fut))
    }
}

fn object_path(key: &str) -> Result<ObjectPath, SinkWriteError> {
    ObjectPath::parse(key).map_err(|e| SinkWriteError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

impl BlobStore for ObjectStoreBlobs {
    fn name(&self) -> &str {
        match self.backend {
            StorageBackend::S3 { .. } => "s3",
            StorageBackend::Local { .. } => "local",
            StorageBackend::Memory => "memory",
        }
    }

    fn put(&self, bucket: &str, key: &str, body: String) -> Result<(), SinkWriteError> {
        let path = object_path(key)?;
        let store = self.store_for(bucket)?;
        let bytes = body.len();
        self.block_on(store.put(&path, PutPayload::from(body)))?
            .map_err(|e| SinkWriteError::Write {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(backend = self.name(), bucket, key, bytes, "blob written");
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<String, SinkWriteError> {
        let path = object_path(key)?;
        let store = self.store_for(bucket)?;
        let read = |reason: String| SinkWriteError::Read {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let bytes = self
            .block_on(async {
                let result = store.get(&path).await?;
                result.bytes().await
            })?
            .map_err(|e| read(e.to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| read(e.to_string()))
    }
}

/// Persists aggregate tables as CSV blobs.
pub struct SinkWriter {
    blobs: Arc<dyn BlobStore>,
}

impl SinkWriter {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Encode `table` with a header row and write it to `bucket/key`.
    ///
    /// Errors are returned to the caller and not notified here.
    pub fn save(&self, table: &[AggregateRow], bucket: &str, key: &str) -> Result<(), SinkWriteError> {
        let body = encode_csv(table)?;
        self.blobs.put(bucket, key, body)?;
        info!("Data successfully saved: {bucket}/{key}");
        Ok(())
    }

    /// Read back a table written by [`SinkWriter::save`].
    pub fn load(&self, bucket: &str, key: &str) -> Result<Vec<AggregateRow>, SinkWriteError> {
        let body = self.blobs.get(bucket, key)?;
        Ok(decode_csv(&body)?)
    }
}
