//! Job domain types for episode processing tasks tracked by the client.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Opaque identifier the processing backend assigns to a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A processing job for one podcast episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    #[serde(default)]
    pub podcast_name: String,
    #[serde(default)]
    pub episode_title: String,
    #[serde(alias = "rss_url")]
    pub feed_url: String,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Job {
    pub fn new(
        job_id: JobId,
        podcast_name: impl Into<String>,
        episode_title: impl Into<String>,
        feed_url: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            podcast_name: podcast_name.into(),
            episode_title: episode_title.into(),
            feed_url: feed_url.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.job_id.as_str().trim().is_empty() {
            return Err(SchemaError::MissingField("job_id"));
        }
        if self.feed_url.trim().is_empty() {
            return Err(SchemaError::MissingField("feed_url"));
        }
        Ok(())
    }
}

/// Lifecycle state reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    /// Terminal states expect no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage names in execution order, plus the off-pipeline error markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Initialization,
    FetchEpisodes,
    Download,
    Transcription,
    ContentDetection,
    AudioEditing,
    RssModification,
    Cleanup,
    Completion,
    Error,
    Failed,
}

/// How a pipeline stage relates to the job's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageProgress {
    Completed,
    InProgress,
    Pending,
}

impl Stage {
    /// Stages in the order the backend runs them.
    pub const PIPELINE: [Stage; 9] = [
        Stage::Initialization,
        Stage::FetchEpisodes,
        Stage::Download,
        Stage::Transcription,
        Stage::ContentDetection,
        Stage::AudioEditing,
        Stage::RssModification,
        Stage::Cleanup,
        Stage::Completion,
    ];

    /// Position in [`Stage::PIPELINE`]; `None` for error markers.
    pub fn pipeline_index(self) -> Option<usize> {
        Self::PIPELINE.iter().position(|s| *s == self)
    }

    /// Classify `stage` relative to `current`.
    pub fn progress_of(current: Stage, stage: Stage) -> StageProgress {
        match (current.pipeline_index(), stage.pipeline_index()) {
            (Some(cur), Some(idx)) if idx < cur => StageProgress::Completed,
            (Some(cur), Some(idx)) if idx == cur => StageProgress::InProgress,
            _ => StageProgress::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initialization => "INITIALIZATION",
            Stage::FetchEpisodes => "FETCH_EPISODES",
            Stage::Download => "DOWNLOAD",
            Stage::Transcription => "TRANSCRIPTION",
            Stage::ContentDetection => "CONTENT_DETECTION",
            Stage::AudioEditing => "AUDIO_EDITING",
            Stage::RssModification => "RSS_MODIFICATION",
            Stage::Cleanup => "CLEANUP",
            Stage::Completion => "COMPLETION",
            Stage::Error => "ERROR",
            Stage::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known status of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    pub current_stage: Stage,
    /// Percentage in `0..=100`.
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    /// Seconds since the Unix epoch of the last backend update.
    pub timestamp: f64,
    /// Set on the client-side stand-in created at submission time.
    #[serde(skip)]
    pub provisional: bool,
}

impl JobStatus {
    /// Stand-in shown between a successful submit and the first poll.
    pub fn placeholder() -> Self {
        Self {
            status: JobState::Queued,
            current_stage: Stage::Initialization,
            progress: 0,
            message: String::new(),
            timestamp: now_secs(),
            provisional: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.progress > 100 {
            return Err(SchemaError::OutOfRange {
                field: "progress",
                value: self.progress.to_string(),
            });
        }
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(SchemaError::OutOfRange {
                field: "timestamp",
                value: self.timestamp.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `incoming` should replace `self` in the status map.
    ///
    /// Placeholders always yield; otherwise an older update never overwrites a newer one.
    pub fn superseded_by(&self, incoming: &JobStatus) -> bool {
        self.provisional || incoming.timestamp >= self.timestamp
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        let millis = (self.timestamp * 1000.0) as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// A non-terminal status that has not changed for longer than `threshold_secs`.
    pub fn is_stalled(&self, now: f64, threshold_secs: f64) -> bool {
        !self.is_terminal() && !self.provisional && now - self.timestamp > threshold_secs
    }
}

/// Current wall clock as fractional epoch seconds.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    fn status(state: JobState, stage: Stage, progress: u8, timestamp: f64) -> JobStatus {
        JobStatus {
            status: state,
            current_stage: stage,
            progress,
            message: String::new(),
            timestamp,
            provisional: false,
        }
    }

    #[test]
    fn decodes_backend_status() {
        let raw = r#"{"status":"in_progress","current_stage":"TRANSCRIPTION","progress":50,
            "message":"Initializing Whisper model","timestamp":1718000000.25}"#;
        let parsed: JobStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, JobState::InProgress);
        assert_eq!(parsed.current_stage, Stage::Transcription);
        assert_eq!(parsed.progress, 50);
        assert!(!parsed.provisional);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_stage_and_state() {
        let bad_stage = r#"{"status":"queued","current_stage":"MIXING","progress":0,"timestamp":1}"#;
        assert!(serde_json::from_str::<JobStatus>(bad_stage).is_err());

        let bad_state = r#"{"status":"paused","current_stage":"DOWNLOAD","progress":0,"timestamp":1}"#;
        assert!(serde_json::from_str::<JobStatus>(bad_state).is_err());
    }

    #[test]
    fn progress_over_one_hundred_is_invalid() {
        let s = status(JobState::InProgress, Stage::Download, 120, 10.0);
        assert!(matches!(
            s.validate(),
            Err(SchemaError::OutOfRange { field: "progress", .. })
        ));
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::InProgress.is_terminal());
    }

    #[test]
    fn placeholder_is_queued_initialization() {
        let p = JobStatus::placeholder();
        assert_eq!(p.status, JobState::Queued);
        assert_eq!(p.current_stage, Stage::Initialization);
        assert_eq!(p.progress, 0);
        assert!(p.provisional);
    }

    #[test]
    fn older_update_does_not_supersede_newer() {
        let newer = status(JobState::InProgress, Stage::AudioEditing, 90, 200.0);
        let older = status(JobState::InProgress, Stage::Transcription, 50, 100.0);
        assert!(!newer.superseded_by(&older));
        assert!(older.superseded_by(&newer));

        let mut placeholder = JobStatus::placeholder();
        placeholder.timestamp = 1_000_000.0;
        assert!(placeholder.superseded_by(&older));
    }

    #[test]
    fn stage_progress_relative_to_current() {
        let cur = Stage::Transcription;
        assert_eq!(Stage::progress_of(cur, Stage::Download), StageProgress::Completed);
        assert_eq!(Stage::progress_of(cur, Stage::Transcription), StageProgress::InProgress);
        assert_eq!(Stage::progress_of(cur, Stage::Completion), StageProgress::Pending);
        assert_eq!(Stage::progress_of(Stage::Error, Stage::Download), StageProgress::Pending);
    }

    #[test]
    fn stalled_only_when_non_terminal_and_old() {
        let running = status(JobState::InProgress, Stage::Download, 30, 100.0);
        assert!(running.is_stalled(2000.0, 1800.0));
        assert!(!running.is_stalled(1000.0, 1800.0));

        let done = status(JobState::Completed, Stage::Completion, 100, 100.0);
        assert!(!done.is_stalled(5000.0, 1800.0));
    }

    #[test]
    fn job_accepts_rss_url_alias() {
        let raw = r#"{"job_id":"abc","podcast_name":"Show","episode_title":"Ep 1",
            "rss_url":"https://example.com/feed.xml"}"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.feed_url, "https://example.com/feed.xml");
        assert!(job.validate().is_ok());
    }
}
