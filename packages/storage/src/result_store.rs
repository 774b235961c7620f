//! The aggregate snapshot document and the seam the tracker reads it through.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use podcast_core::ResultSnapshot;

use crate::{Storage, StorageConfig, StorageError};

/// Future type for snapshot fetches.
pub type SnapshotFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ResultSnapshot, StorageError>> + Send + 'a>>;

/// Anything that can produce a fresh Result Store snapshot.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch and decode the current aggregate document.
    fn fetch_snapshot(&self) -> SnapshotFuture<'_>;
}

/// Object-store backed Result Store.
#[derive(Clone)]
pub struct ResultStore {
    storage: Storage,
    snapshot_key: String,
}

impl ResultStore {
    pub fn new(storage: Storage, snapshot_key: impl Into<String>) -> Self {
        Self {
            storage,
            snapshot_key: snapshot_key.into(),
        }
    }

    pub async fn open(cfg: &StorageConfig) -> Result<Self, StorageError> {
        let storage = Storage::new(cfg).await?;
        Ok(Self::new(storage, cfg.snapshot_key.clone()))
    }

    pub async fn from_env() -> Result<Self, StorageError> {
        Self::open(&StorageConfig::from_env()?).await
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    /// Read the aggregate document. A missing document is an empty snapshot.
    pub async fn load(&self) -> Result<ResultSnapshot, StorageError> {
        let bytes = match self.storage.get_bytes(&self.snapshot_key).await {
            Ok(bytes) => bytes,
            Err(StorageError::ObjectStore(object_store::Error::NotFound { .. })) => {
                tracing::debug!(key = %self.snapshot_key, "No snapshot document yet");
                return Ok(ResultSnapshot::default());
            }
            Err(e) => return Err(e),
        };
        Ok(ResultSnapshot::from_slice(&bytes)?)
    }

    /// Overwrite the aggregate document.
    pub async fn save(&self, snapshot: &ResultSnapshot) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        self.storage
            .put_bytes(&self.snapshot_key, Bytes::from(bytes))
            .await
    }
}

impl SnapshotSource for ResultStore {
    fn fetch_snapshot(&self) -> SnapshotFuture<'_> {
        Box::pin(self.load())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use podcast_core::{AutoProcessedPodcast, PodcastInfo, ProcessedEpisodeRecord};

    fn record(title: &str) -> ProcessedEpisodeRecord {
        ProcessedEpisodeRecord {
            podcast_title: "Show".into(),
            episode_title: title.into(),
            feed_url: "https://example.com/feed.xml".into(),
            edited_audio_locator: format!("edited/{title}.mp3"),
            transcript_locator: format!("transcripts/{title}.json"),
            unwanted_content_locator: format!("unwanted/{title}.json"),
        }
    }

    #[tokio::test]
    async fn missing_document_is_empty_snapshot() -> Result<(), StorageError> {
        let store = ResultStore::open(&StorageConfig::memory()).await?;
        let snap = store.fetch_snapshot().await?;
        assert!(snap.processed_episodes.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn filesystem_snapshot_round_trip() -> Result<(), StorageError> {
        let dir = tempfile::tempdir()?;
        let store = ResultStore::open(&StorageConfig::filesystem(dir.path())).await?;

        let mut snap = ResultSnapshot {
            processed_episodes: vec![record("ep1"), record("ep2")],
            ..Default::default()
        };
        snap.upsert_auto_processed(AutoProcessedPodcast {
            feed_url: "https://example.com/feed.xml".into(),
            enabled_at: 1_718_000_000.0,
        });
        snap.podcast_info_by_feed.insert(
            "https://example.com/feed.xml".into(),
            PodcastInfo::new("Show", None),
        );
        store.save(&snap).await?;

        let loaded = store.fetch_snapshot().await?;
        assert_eq!(loaded, snap);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_document_is_reported() -> Result<(), StorageError> {
        let store = ResultStore::open(&StorageConfig::memory()).await?;
        store
            .storage()
            .put_bytes(store.snapshot_key(), Bytes::from_static(b"{\"processed\": \"nope\"}"))
            .await?;
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Schema(_)));
        Ok(())
    }
}
