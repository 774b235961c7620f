//! Client for the podcast processing backend.
//!
//! This crate contains:
//! - The `ProcessingBackend` trait the tracker talks to
//! - `HttpBackend`, its reqwest implementation
//! - `ApiError`, normalizing transport, HTTP and schema failures

mod backend;
mod client;
mod error;

pub use backend::{BackendFuture, ProcessingBackend};
pub use client::HttpBackend;
pub use error::ApiError;

// Re-export core types for convenience
pub use podcast_core::{Episode, Job, JobId, JobState, JobStatus, PodcastSummary, Prompts};
