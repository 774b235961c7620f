//! Read-only snapshot of tracker state published to subscribers.

use std::collections::HashMap;

use podcast_core::{Episode, Job, JobId, JobStatus, PodcastInfo, ResultSnapshot};

/// Everything a presentation layer needs to render the tracker.
///
/// Replaced wholesale after every state transition.
#[derive(Debug, Clone, Default)]
pub struct TrackerView {
    /// Jobs awaiting a terminal status, in submission order.
    pub in_flight: Vec<JobId>,
    /// Display metadata for every in-flight job.
    pub job_info: HashMap<JobId, Job>,
    /// Latest known status per job. Entries outlive eviction from the
    /// in-flight set so the final status stays visible.
    pub statuses: HashMap<JobId, JobStatus>,
    /// Last Result Store snapshot seen by the tracker.
    pub results: ResultSnapshot,
    /// Episode lists by feed URL.
    pub episodes: HashMap<String, Vec<Episode>>,
    /// Whether the polling timer is running.
    pub polling: bool,
}

impl TrackerView {
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn status(&self, job_id: &JobId) -> Option<&JobStatus> {
        self.statuses.get(job_id)
    }

    /// In-flight jobs with their latest status, in submission order.
    pub fn jobs(&self) -> impl Iterator<Item = (&Job, Option<&JobStatus>)> {
        self.in_flight
            .iter()
            .filter_map(|id| self.job_info.get(id).map(|job| (job, self.statuses.get(id))))
    }

    pub fn podcast_info(&self, feed_url: &str) -> Option<&PodcastInfo> {
        self.results.podcast_info_by_feed.get(feed_url)
    }

    pub fn is_auto_processed(&self, feed_url: &str) -> bool {
        self.results
            .auto_processed_podcasts
            .iter()
            .any(|p| p.feed_url == feed_url)
    }
}
