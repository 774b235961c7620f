//! Message types for the tracker actor.

use std::collections::HashMap;

use podcast_core::{AutoProcessedPodcast, Episode, Job, JobId, JobStatus, PodcastInfo, ResultSnapshot};
use ractor::RpcReplyPort;

/// Messages for the TrackerActor.
///
/// Network calls for user actions happen outside the actor; these messages
/// carry their outcomes in so every state change is applied in one place.
#[derive(Debug)]
pub enum TrackerMessage {
    /// The backend accepted a new job.
    JobAccepted {
        job: Job,
        reply: RpcReplyPort<()>,
    },

    /// The backend deleted a job.
    JobDeleted {
        job_id: JobId,
        reply: RpcReplyPort<()>,
    },

    /// Result of the initial load.
    Loaded {
        snapshot: ResultSnapshot,
        jobs: Vec<Job>,
        statuses: HashMap<JobId, JobStatus>,
        reply: RpcReplyPort<()>,
    },

    /// Episode list fetched for a feed.
    EpisodesLoaded {
        feed_url: String,
        episodes: Vec<Episode>,
        reply: RpcReplyPort<()>,
    },

    /// A freshly fetched Result Store snapshot.
    ResultsLoaded {
        snapshot: ResultSnapshot,
        reply: Option<RpcReplyPort<()>>,
    },

    /// A feed was enrolled for automatic processing.
    AutoProcessingEnabled {
        entry: AutoProcessedPodcast,
        info: Option<PodcastInfo>,
        reply: RpcReplyPort<()>,
    },

    /// A feed was withdrawn from automatic processing.
    AutoProcessingRemoved {
        feed_url: String,
        reply: RpcReplyPort<()>,
    },

    /// Periodic poll from the timer.
    Tick,

    /// Poll immediately and report what happened.
    PollNow { reply: RpcReplyPort<PollOutcome> },

    /// A batch status request finished.
    PollCompleted {
        requested: Vec<JobId>,
        result: Result<HashMap<JobId, JobStatus>, String>,
        reply: Option<RpcReplyPort<PollOutcome>>,
    },

    /// Stop the timer and the actor.
    Shutdown,
}

/// What a poll did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing in flight; no request was sent.
    Idle,
    /// A previous request is still outstanding.
    Skipped,
    /// The batch request failed; state is unchanged.
    Failed(String),
    Polled(PollReport),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    /// Jobs whose status entry changed.
    pub updated: Vec<JobId>,
    /// Jobs evicted after reaching a terminal state.
    pub finished: Vec<JobId>,
    /// Jobs evicted because the backend returned no status for them.
    pub vanished: Vec<JobId>,
    /// Whether a forced Result Store refresh was started.
    pub refreshing: bool,
}
