//! Client-side cache of the Result Store snapshot.

use std::sync::Arc;
use std::time::Duration;

use podcast_core::ResultSnapshot;
use storage::{SnapshotSource, StorageError};
use tokio::sync::Mutex;
use tokio::time::Instant;

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: ResultSnapshot,
}

/// A snapshot read, and whether it was served without a fetch.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: ResultSnapshot,
    pub from_cache: bool,
}

/// Snapshot cache with a fixed cooldown.
///
/// The slot lock is held across the fetch, so concurrent readers inside the
/// cooldown share one network call. A failed fetch leaves the previous
/// snapshot and its timestamp untouched.
pub struct ResultCache {
    source: Arc<dyn SnapshotSource>,
    cooldown: Duration,
    slot: Mutex<Option<CachedSnapshot>>,
}

impl ResultCache {
    pub fn new(source: Arc<dyn SnapshotSource>, cooldown: Duration) -> Self {
        Self {
            source,
            cooldown,
            slot: Mutex::new(None),
        }
    }

    pub async fn get(&self, force_refresh: bool) -> Result<CacheRead, StorageError> {
        let mut slot = self.slot.lock().await;

        if !force_refresh
            && let Some(cached) = slot.as_ref()
            && cached.fetched_at.elapsed() < self.cooldown
        {
            return Ok(CacheRead {
                snapshot: cached.snapshot.clone(),
                from_cache: true,
            });
        }

        let snapshot = self.source.fetch_snapshot().await?;
        tracing::debug!(
            processed = snapshot.processed_episodes.len(),
            force_refresh,
            "Fetched result snapshot"
        );
        *slot = Some(CachedSnapshot {
            fetched_at: Instant::now(),
            snapshot: snapshot.clone(),
        });

        Ok(CacheRead {
            snapshot,
            from_cache: false,
        })
    }

    /// Apply a local change to the cached snapshot, if there is one.
    pub async fn modify(&self, f: impl FnOnce(&mut ResultSnapshot)) {
        if let Some(cached) = self.slot.lock().await.as_mut() {
            f(&mut cached.snapshot);
        }
    }

    pub async fn cached(&self) -> Option<ResultSnapshot> {
        self.slot.lock().await.as_ref().map(|c| c.snapshot.clone())
    }
}
