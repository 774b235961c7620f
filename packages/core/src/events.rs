//! Notifications emitted by the job status tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, JobState, JobStatus};

/// Discrete tracker notifications, for toasts and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// A processing job was accepted by the backend.
    JobSubmitted { job: Job, timestamp: DateTime<Utc> },
    /// A poll brought a new status for a job.
    JobStatusChanged {
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A job reached a terminal state and left the in-flight set.
    JobFinished {
        job_id: JobId,
        state: JobState,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A job was deleted on request.
    JobDeleted {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// A polled job came back without a status; the backend no longer knows it.
    JobVanished {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// A job has not reported progress within the stall window.
    JobStalled {
        job_id: JobId,
        last_update_secs: f64,
        timestamp: DateTime<Utc>,
    },
    /// A batch status request failed; the next tick retries.
    PollFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// The processed-results snapshot was replaced.
    ResultsRefreshed {
        processed: usize,
        auto_processed: usize,
        timestamp: DateTime<Utc>,
    },
    /// A user-triggered operation failed.
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TrackerEvent::JobSubmitted { timestamp, .. } => *timestamp,
            TrackerEvent::JobStatusChanged { timestamp, .. } => *timestamp,
            TrackerEvent::JobFinished { timestamp, .. } => *timestamp,
            TrackerEvent::JobDeleted { timestamp, .. } => *timestamp,
            TrackerEvent::JobVanished { timestamp, .. } => *timestamp,
            TrackerEvent::JobStalled { timestamp, .. } => *timestamp,
            TrackerEvent::PollFailed { timestamp, .. } => *timestamp,
            TrackerEvent::ResultsRefreshed { timestamp, .. } => *timestamp,
            TrackerEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            TrackerEvent::JobSubmitted { job, .. } => Some(&job.job_id),
            TrackerEvent::JobStatusChanged { job_id, .. } => Some(job_id),
            TrackerEvent::JobFinished { job_id, .. } => Some(job_id),
            TrackerEvent::JobDeleted { job_id, .. } => Some(job_id),
            TrackerEvent::JobVanished { job_id, .. } => Some(job_id),
            TrackerEvent::JobStalled { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Short description for logging and notifications.
    pub fn description(&self) -> String {
        match self {
            TrackerEvent::JobSubmitted { job, .. } => {
                format!("Processing '{}' ({})", job.episode_title, job.job_id)
            }
            TrackerEvent::JobStatusChanged { job_id, status, .. } => format!(
                "Job {} {} at {} ({}%)",
                job_id, status.status, status.current_stage, status.progress
            ),
            TrackerEvent::JobFinished {
                job_id,
                state,
                message,
                ..
            } => {
                if message.is_empty() {
                    format!("Job {} {}", job_id, state)
                } else {
                    format!("Job {} {}: {}", job_id, state, message)
                }
            }
            TrackerEvent::JobDeleted { job_id, .. } => format!("Job {} deleted", job_id),
            TrackerEvent::JobVanished { job_id, .. } => {
                format!("Job {} is no longer known to the backend", job_id)
            }
            TrackerEvent::JobStalled {
                job_id,
                last_update_secs,
                ..
            } => format!(
                "Job {} has not reported progress for {:.0}s",
                job_id, last_update_secs
            ),
            TrackerEvent::PollFailed { error, .. } => format!("Status poll failed: {}", error),
            TrackerEvent::ResultsRefreshed {
                processed,
                auto_processed,
                ..
            } => format!(
                "Results refreshed: {} processed, {} auto-processed",
                processed, auto_processed
            ),
            TrackerEvent::Error { message, .. } => message.clone(),
        }
    }
}
