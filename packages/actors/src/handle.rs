//! Public facade of the job status tracker.

use std::future::Future;
use std::sync::Arc;

use api::ProcessingBackend;
use chrono::Utc;
use podcast_core::{
    AutoProcessedPodcast, Episode, Job, JobId, PodcastInfo, PodcastSummary, Prompts,
    ResultSnapshot, TrackerEvent,
};
use ractor::{ActorRef, RpcReplyPort};
use tokio::sync::{broadcast, watch};

use crate::cache::ResultCache;
use crate::error::TrackerError;
use crate::messages::{PollOutcome, TrackerMessage};
use crate::view::TrackerView;

const UNKNOWN_PODCAST: &str = "Unknown Podcast";

/// Handle to a running tracker.
///
/// Requests to the backend run on the caller's task, so independent user
/// actions proceed concurrently; their outcomes are applied by the tracker
/// actor one at a time. Failed operations are returned to the caller and
/// also broadcast as [`TrackerEvent::Error`].
#[derive(Clone)]
pub struct TrackerHandle {
    actor: ActorRef<TrackerMessage>,
    backend: Arc<dyn ProcessingBackend>,
    cache: Arc<ResultCache>,
    view_rx: watch::Receiver<TrackerView>,
    event_tx: broadcast::Sender<TrackerEvent>,
}

fn require(field: &str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

impl TrackerHandle {
    pub(crate) fn new(
        actor: ActorRef<TrackerMessage>,
        backend: Arc<dyn ProcessingBackend>,
        cache: Arc<ResultCache>,
        view_rx: watch::Receiver<TrackerView>,
        event_tx: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        Self {
            actor,
            backend,
            cache,
            view_rx,
            event_tx,
        }
    }

    async fn call<T: Send + 'static>(
        &self,
        build: impl FnOnce(RpcReplyPort<T>) -> TrackerMessage,
    ) -> Result<T, TrackerError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(build(tx.into()))
            .map_err(|_| TrackerError::Unavailable("tracker actor has stopped".into()))?;
        rx.await
            .map_err(|_| TrackerError::Unavailable("tracker dropped the reply".into()))
    }

    /// Run an operation, broadcasting its failure as a notification.
    async fn reported<T>(
        &self,
        operation: impl Future<Output = Result<T, TrackerError>>,
    ) -> Result<T, TrackerError> {
        let result = operation.await;
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "Tracker operation failed");
            let _ = self.event_tx.send(TrackerEvent::Error {
                message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    /// Current state.
    pub fn view(&self) -> TrackerView {
        self.view_rx.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<TrackerView> {
        self.view_rx.clone()
    }

    /// Discrete notifications from now on.
    pub fn events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_tx.subscribe()
    }

    /// Load processed results and the jobs the backend still has in flight.
    ///
    /// All-or-nothing: on any failure the tracker state is left unchanged.
    pub async fn load(&self) -> Result<(), TrackerError> {
        self.reported(self.load_inner()).await
    }

    async fn load_inner(&self) -> Result<(), TrackerError> {
        let (results, jobs) = tokio::join!(self.cache.get(true), self.backend.current_jobs());
        let snapshot = results?.snapshot;
        let jobs: Vec<Job> = jobs?
            .into_iter()
            .map(|mut job| {
                if let Some(info) = snapshot.podcast_info_by_feed.get(&job.feed_url) {
                    job.podcast_name = info.name.clone();
                    if job.image_url.is_none() {
                        job.image_url = info.image_url.clone();
                    }
                }
                job
            })
            .collect();

        let statuses = if jobs.is_empty() {
            Default::default()
        } else {
            let ids: Vec<JobId> = jobs.iter().map(|j| j.job_id.clone()).collect();
            self.backend.batch_status(&ids).await?
        };

        self.call(|reply| TrackerMessage::Loaded {
            snapshot,
            jobs,
            statuses,
            reply,
        })
        .await
    }

    /// Episode list of a feed. Feeds already loaded are served from memory.
    pub async fn fetch_episodes(&self, feed_url: &str) -> Result<Vec<Episode>, TrackerError> {
        self.reported(self.fetch_episodes_inner(feed_url.trim()))
            .await
    }

    async fn fetch_episodes_inner(&self, feed_url: &str) -> Result<Vec<Episode>, TrackerError> {
        require("feed URL", feed_url)?;
        let cached = self.view_rx.borrow().episodes.get(feed_url).cloned();
        if let Some(episodes) = cached {
            return Ok(episodes);
        }

        let episodes = self.backend.fetch_episodes(feed_url).await?;
        self.call(|reply| TrackerMessage::EpisodesLoaded {
            feed_url: feed_url.to_string(),
            episodes: episodes.clone(),
            reply,
        })
        .await?;
        Ok(episodes)
    }

    /// Podcast directory search.
    pub async fn search(&self, query: &str) -> Result<Vec<PodcastSummary>, TrackerError> {
        self.reported(async {
            require("search query", query)?;
            Ok(self.backend.search(query.trim()).await?)
        })
        .await
    }

    /// Submit one episode of a feed for processing.
    ///
    /// The job is tracked with a placeholder status until the first poll.
    /// Nothing is tracked when the backend rejects the request.
    pub async fn submit_job(&self, feed_url: &str, episode_index: usize) -> Result<Job, TrackerError> {
        self.reported(self.submit_job_inner(feed_url.trim(), episode_index))
            .await
    }

    async fn submit_job_inner(
        &self,
        feed_url: &str,
        episode_index: usize,
    ) -> Result<Job, TrackerError> {
        require("feed URL", feed_url)?;

        let episodes = self.fetch_episodes_inner(feed_url).await?;
        let Some(episode) = episodes.get(episode_index) else {
            return Err(TrackerError::InvalidInput(format!(
                "episode index {episode_index} out of range for {feed_url} ({} episodes)",
                episodes.len()
            )));
        };
        let episode_title = episode.title.clone();

        let info = self.view_rx.borrow().podcast_info(feed_url).cloned();
        let (podcast_name, image_url) = match info {
            Some(info) => (info.name, info.image_url),
            None => (UNKNOWN_PODCAST.to_string(), None),
        };

        let job_id = self.backend.submit_job(feed_url, episode_index).await?;
        let job = Job::new(job_id, podcast_name, episode_title, feed_url).with_image(image_url);

        self.call(|reply| TrackerMessage::JobAccepted {
            job: job.clone(),
            reply,
        })
        .await?;
        Ok(job)
    }

    /// Delete or cancel a job. On failure the job stays tracked.
    pub async fn delete_job(&self, job_id: &JobId) -> Result<(), TrackerError> {
        self.reported(async {
            require("job id", job_id.as_str())?;
            self.backend.delete_job(job_id).await?;
            self.call(|reply| TrackerMessage::JobDeleted {
                job_id: job_id.clone(),
                reply,
            })
            .await
        })
        .await
    }

    /// Poll job statuses now instead of waiting for the next tick.
    pub async fn poll_now(&self) -> Result<PollOutcome, TrackerError> {
        self.call(|reply| TrackerMessage::PollNow { reply }).await
    }

    /// The Result Store snapshot, served from cache within the cooldown
    /// unless `force_refresh` is set.
    ///
    /// A failed fetch keeps the previous snapshot in place.
    pub async fn processed_data(&self, force_refresh: bool) -> Result<ResultSnapshot, TrackerError> {
        self.reported(async {
            let read = self.cache.get(force_refresh).await?;
            if !read.from_cache {
                self.call(|reply| TrackerMessage::ResultsLoaded {
                    snapshot: read.snapshot.clone(),
                    reply: Some(reply),
                })
                .await?;
            }
            Ok(read.snapshot)
        })
        .await
    }

    /// Enroll a feed for automatic processing.
    ///
    /// Enrolling a feed twice leaves a single entry with the latest
    /// `enabled_at`.
    pub async fn enable_auto_processing(
        &self,
        feed_url: &str,
        info: Option<PodcastInfo>,
    ) -> Result<AutoProcessedPodcast, TrackerError> {
        let feed_url = feed_url.trim();
        self.reported(async {
            require("feed URL", feed_url)?;
            let enabled_at = self.backend.enable_auto_processing(feed_url).await?;
            let entry = AutoProcessedPodcast {
                feed_url: feed_url.to_string(),
                enabled_at,
            };

            self.cache
                .modify(|snapshot| {
                    snapshot.upsert_auto_processed(entry.clone());
                    if let Some(info) = &info {
                        snapshot
                            .podcast_info_by_feed
                            .insert(entry.feed_url.clone(), info.clone());
                    }
                })
                .await;
            self.call(|reply| TrackerMessage::AutoProcessingEnabled {
                entry: entry.clone(),
                info,
                reply,
            })
            .await?;
            Ok(entry)
        })
        .await
    }

    /// Withdraw a feed from automatic processing.
    pub async fn delete_auto_processed_podcast(&self, feed_url: &str) -> Result<(), TrackerError> {
        let feed_url = feed_url.trim();
        self.reported(async {
            require("feed URL", feed_url)?;
            self.backend.delete_auto_processed(feed_url).await?;
            self.cache
                .modify(|snapshot| {
                    snapshot.remove_auto_processed(feed_url);
                })
                .await;
            self.call(|reply| TrackerMessage::AutoProcessingRemoved {
                feed_url: feed_url.to_string(),
                reply,
            })
            .await
        })
        .await
    }

    /// Delete a processed episode, then refresh the processed results.
    ///
    /// A failed refresh after a successful delete is only notified.
    pub async fn delete_processed_episode(
        &self,
        podcast_title: &str,
        episode_title: &str,
    ) -> Result<(), TrackerError> {
        self.reported(async {
            require("podcast title", podcast_title)?;
            require("episode title", episode_title)?;
            self.backend
                .delete_processed_episode(podcast_title, episode_title)
                .await?;
            tracing::info!(podcast_title, episode_title, "Processed episode deleted");
            Ok(())
        })
        .await?;

        let _ = self.processed_data(true).await;
        Ok(())
    }

    /// Rewritten RSS document of a feed.
    pub async fn modified_feed(&self, feed_url: &str) -> Result<String, TrackerError> {
        self.reported(async {
            require("feed URL", feed_url)?;
            Ok(self.backend.modified_feed(feed_url.trim()).await?)
        })
        .await
    }

    pub async fn prompts(&self) -> Result<Prompts, TrackerError> {
        self.reported(async { Ok(self.backend.prompts().await?) }).await
    }

    pub async fn save_prompts(&self, prompts: &Prompts) -> Result<(), TrackerError> {
        self.reported(async { Ok(self.backend.save_prompts(prompts).await?) }).await
    }

    /// Stop polling and the tracker actor.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(TrackerMessage::Shutdown);
    }
}
