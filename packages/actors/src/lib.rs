//! Job status tracker built on Ractor.
//!
//! # Architecture
//!
//! - `TrackerActor` - Single owner of the in-flight set, job info, status map
//!   and the polling timer
//! - `TrackerHandle` - Facade that performs backend requests and hands their
//!   outcomes to the actor
//! - `ResultCache` - Result Store snapshot with a refetch cooldown
//!
//! # Usage
//!
//! ```ignore
//! use actors::{TrackerConfig, start_tracker};
//!
//! let (tracker, _handle) = start_tracker(&config, backend, result_store).await?;
//! tracker.load().await?;
//! let job = tracker.submit_job("https://example.com/feed.xml", 2).await?;
//! let mut view = tracker.subscribe();
//! ```

mod cache;
mod config;
mod error;
mod handle;
mod messages;
mod timer;
mod tracker_actor;
mod view;

use std::sync::Arc;

use api::ProcessingBackend;
use ractor::Actor;
use storage::SnapshotSource;
use tokio::sync::{broadcast, watch};

pub use cache::{CacheRead, ResultCache};
pub use config::{ConfigError, TrackerConfig};
pub use error::TrackerError;
pub use handle::TrackerHandle;
pub use messages::{PollOutcome, PollReport, TrackerMessage};
pub use tracker_actor::{TrackerActor, TrackerArgs};
pub use view::TrackerView;

const EVENT_CAPACITY: usize = 1024;

/// Spawn a tracker actor and return its handle.
pub async fn start_tracker(
    config: &TrackerConfig,
    backend: Arc<dyn ProcessingBackend>,
    source: Arc<dyn SnapshotSource>,
) -> Result<(TrackerHandle, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    let cache = Arc::new(ResultCache::new(source, config.cache_cooldown));
    let (view_tx, view_rx) = watch::channel(TrackerView::default());
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let args = TrackerArgs {
        backend: backend.clone(),
        cache: cache.clone(),
        poll_interval: config.poll_interval,
        stall_timeout: config.stall_timeout,
        view_tx,
        event_tx: event_tx.clone(),
    };
    let (actor, handle) = Actor::spawn(None, TrackerActor, args).await?;

    Ok((
        TrackerHandle::new(actor, backend, cache, view_rx, event_tx),
        handle,
    ))
}
