//! Result Store access for the podcast tracker.
//!
//! Goal:
//! - S3-compatible storage in production/staging
//! - On-disk storage for local dev
//! - In-memory storage for tests
//!
//! The store holds one aggregate JSON document describing processed episodes,
//! auto-processed feeds and podcast display metadata, next to the episode
//! artifacts (edited audio, transcripts, detected content) it references.

mod config;
mod result_store;

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::ObjectStore;
use object_store::ObjectStoreExt;
use object_store::path::Path;
use object_store::signer::Signer;

pub use config::{DEFAULT_SNAPSHOT_KEY, S3Config, StorageBackendConfig, StorageConfig};
pub use result_store::{ResultStore, SnapshotFuture, SnapshotSource};

use config::non_empty;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object_store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot document: {0}")]
    Schema(#[from] podcast_core::SchemaError),

    #[error("{0} is not supported by the {1} backend")]
    Unsupported(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    S3,
    Filesystem,
    Memory,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::S3 => "s3",
            StorageKind::Filesystem => "filesystem",
            StorageKind::Memory => "memory",
        }
    }
}

#[derive(Clone)]
pub struct Storage {
    kind: StorageKind,
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    prefix: Option<String>,
}

impl Storage {
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub async fn new(cfg: &StorageConfig) -> Result<Self, StorageError> {
        let (kind, store, signer): (_, Arc<dyn ObjectStore>, Option<Arc<dyn Signer>>) =
            match &cfg.backend {
                StorageBackendConfig::S3(s3) => {
                    let s3 = Arc::new(build_s3(s3.clone())?);
                    (StorageKind::S3, s3.clone(), Some(s3))
                }
                StorageBackendConfig::Filesystem { root } => {
                    ensure_dir(root)?;
                    let fs = object_store::local::LocalFileSystem::new_with_prefix(root)?;
                    (StorageKind::Filesystem, Arc::new(fs), None)
                }
                StorageBackendConfig::Memory => (
                    StorageKind::Memory,
                    Arc::new(object_store::memory::InMemory::new()),
                    None,
                ),
            };

        tracing::debug!(backend = kind.as_str(), "Result store opened");

        Ok(Self {
            kind,
            store,
            signer,
            prefix: cfg.prefix.clone().and_then(non_empty),
        })
    }

    fn to_path(&self, key: &str) -> Result<Path, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidConfig(
                "object key must not be empty".to_string(),
            ));
        }

        let joined = match self.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{key}"),
            _ => key.to_string(),
        };

        Ok(Path::from(joined))
    }

    pub async fn put_bytes(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.to_path(key)?;
        self.store
            .put(&path, object_store::PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.to_path(key)?;
        let res = self.store.get(&path).await?;
        Ok(res.bytes().await?)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.to_path(key)?;
        self.store.delete(&path).await?;
        Ok(())
    }

    /// Presigned GET URL for a stored artifact, valid for `expires_in`.
    pub async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let Some(signer) = self.signer.as_ref() else {
            return Err(StorageError::Unsupported("URL signing", self.kind.as_str()));
        };
        let path = self.to_path(key)?;
        let url = signer
            .signed_url(http::Method::GET, &path, expires_in)
            .await?;
        Ok(url.to_string())
    }
}

fn ensure_dir(root: &FsPath) -> Result<(), StorageError> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

fn build_s3(cfg: S3Config) -> Result<object_store::aws::AmazonS3, StorageError> {
    let mut builder = object_store::aws::AmazonS3Builder::new()
        .with_bucket_name(cfg.bucket)
        .with_region(cfg.region)
        .with_virtual_hosted_style_request(cfg.virtual_hosted_style);

    if let Some(endpoint) = cfg.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if cfg.allow_http {
        builder = builder.with_allow_http(true);
    }
    if let Some(access_key_id) = cfg.access_key_id {
        builder = builder.with_access_key_id(access_key_id);
    }
    if let Some(secret_access_key) = cfg.secret_access_key {
        builder = builder.with_secret_access_key(secret_access_key);
    }
    if let Some(session_token) = cfg.session_token {
        builder = builder.with_token(session_token);
    }

    Ok(builder.build()?)
}
