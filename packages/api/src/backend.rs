//! The processing backend seam.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use podcast_core::{Episode, Job, JobId, JobStatus, PodcastSummary, Prompts};

use crate::ApiError;

/// Future type for backend calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Operations the tracker needs from the processing backend and the
/// podcast directory behind it.
///
/// Implementations validate every response before returning it.
pub trait ProcessingBackend: Send + Sync + 'static {
    /// List the episodes of a feed.
    fn fetch_episodes<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, Vec<Episode>>;

    /// Start processing one episode; returns the new job's identifier.
    fn submit_job<'a>(&'a self, feed_url: &'a str, episode_index: usize)
    -> BackendFuture<'a, JobId>;

    /// Latest status for each requested job. Ids the backend no longer
    /// knows are absent from the map.
    fn batch_status<'a>(
        &'a self,
        job_ids: &'a [JobId],
    ) -> BackendFuture<'a, HashMap<JobId, JobStatus>>;

    /// Jobs the backend still considers in flight.
    fn current_jobs(&self) -> BackendFuture<'_, Vec<Job>>;

    /// Delete or cancel a job.
    fn delete_job<'a>(&'a self, job_id: &'a JobId) -> BackendFuture<'a, ()>;

    /// Free-text podcast directory search.
    fn search<'a>(&'a self, query: &'a str) -> BackendFuture<'a, Vec<PodcastSummary>>;

    /// Remove a processed episode from the Result Store.
    fn delete_processed_episode<'a>(
        &'a self,
        podcast_title: &'a str,
        episode_title: &'a str,
    ) -> BackendFuture<'a, ()>;

    /// Enroll a feed for automatic processing; returns `enabled_at` (epoch seconds).
    fn enable_auto_processing<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, f64>;

    /// Withdraw a feed from automatic processing.
    fn delete_auto_processed<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, ()>;

    /// The rewritten RSS document for a feed.
    fn modified_feed<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, String>;

    /// Current LLM prompts.
    fn prompts(&self) -> BackendFuture<'_, Prompts>;

    /// Replace the LLM prompts.
    fn save_prompts<'a>(&'a self, prompts: &'a Prompts) -> BackendFuture<'a, ()>;
}
