//! Core domain types for the podcast processing tracker.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and pipeline Stage for processing tasks
//! - Episodes, search results and display metadata
//! - LLM prompts edited through the backend
//! - The Result Store snapshot
//! - Tracker events for notifications

mod error;
mod events;
mod format;
mod job;
mod podcast;
mod prompts;
mod results;

pub use error::SchemaError;
pub use events::TrackerEvent;
pub use format::{DurationFormat, format_duration};
pub use job::{Job, JobId, JobState, JobStatus, Stage, StageProgress, now_secs};
pub use podcast::{Episode, PodcastInfo, PodcastSummary};
pub use prompts::Prompts;
pub use results::{AutoProcessedPodcast, ProcessedEpisodeRecord, ResultSnapshot};
