//! HTTP client for the processing backend.
//!
//! Wraps the backend's JSON endpoints using [`reqwest`]. Every request
//! carries the session cookie jar and JSON accept headers; every response
//! is checked for a success status and decoded into validated domain types.

use std::collections::HashMap;
use std::time::Duration;

use podcast_core::{Episode, Job, JobId, JobStatus, PodcastSummary, Prompts, SchemaError};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendFuture, ProcessingBackend};
use crate::error::{ApiError, backend_error};

/// HTTP implementation of [`ProcessingBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct FeedRequest<'a> {
    feed_url: &'a str,
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    feed_url: &'a str,
    episode_index: usize,
}

#[derive(Serialize)]
struct BatchStatusRequest<'a> {
    job_ids: &'a [JobId],
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct DeleteProcessedRequest<'a> {
    podcast_title: &'a str,
    episode_title: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    job_id: JobId,
}

#[derive(Deserialize)]
struct AutoProcessResponse {
    enabled_at: f64,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`, e.g. `http://host:5000`.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidInput(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidInput(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn ensure_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(%url, status = status.as_u16(), "Backend request failed");
            return Err(backend_error(status, &body));
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        decode(&bytes)
    }

    async fn check_status(response: Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Schema(SchemaError::from(e)))
}

/// Decode a batch status body. `null` entries carry no update and are dropped.
fn decode_statuses(bytes: &[u8]) -> Result<HashMap<JobId, JobStatus>, ApiError> {
    let raw: HashMap<JobId, Option<JobStatus>> = decode(bytes)?;
    let mut statuses = HashMap::with_capacity(raw.len());
    for (job_id, status) in raw {
        if let Some(status) = status {
            status.validate()?;
            statuses.insert(job_id, status);
        }
    }
    Ok(statuses)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

impl ProcessingBackend for HttpBackend {
    fn fetch_episodes<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, Vec<Episode>> {
        Box::pin(async move {
            require_non_empty("feed_url", feed_url)?;
            let response = self
                .client
                .post(self.url(&["api", "episodes"]))
                .json(&FeedRequest { feed_url })
                .send()
                .await?;
            let episodes: Vec<Episode> = Self::parse_response(response).await?;
            for episode in &episodes {
                episode.validate()?;
            }
            Ok(episodes)
        })
    }

    fn submit_job<'a>(
        &'a self,
        feed_url: &'a str,
        episode_index: usize,
    ) -> BackendFuture<'a, JobId> {
        Box::pin(async move {
            require_non_empty("feed_url", feed_url)?;
            tracing::debug!(feed_url, episode_index, "Submitting episode");
            let response = self
                .client
                .post(self.url(&["api", "process"]))
                .json(&ProcessRequest {
                    feed_url,
                    episode_index,
                })
                .send()
                .await?;
            let parsed: ProcessResponse = Self::parse_response(response).await?;
            if parsed.job_id.as_str().trim().is_empty() {
                return Err(SchemaError::MissingField("job_id").into());
            }
            Ok(parsed.job_id)
        })
    }

    fn batch_status<'a>(
        &'a self,
        job_ids: &'a [JobId],
    ) -> BackendFuture<'a, HashMap<JobId, JobStatus>> {
        Box::pin(async move {
            tracing::debug!(jobs = job_ids.len(), "Requesting batch status");
            let response = self
                .client
                .post(self.url(&["api", "batch_process_status"]))
                .json(&BatchStatusRequest { job_ids })
                .send()
                .await?;
            let response = Self::ensure_success(response).await?;
            let bytes = response.bytes().await?;
            decode_statuses(&bytes)
        })
    }

    fn current_jobs(&self) -> BackendFuture<'_, Vec<Job>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(&["api", "current_jobs"]))
                .send()
                .await?;
            let jobs: Vec<Job> = Self::parse_response(response).await?;
            for job in &jobs {
                job.validate()?;
            }
            Ok(jobs)
        })
    }

    fn delete_job<'a>(&'a self, job_id: &'a JobId) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            require_non_empty("job_id", job_id.as_str())?;
            let response = self
                .client
                .delete(self.url(&["api", "delete_job", job_id.as_str()]))
                .send()
                .await?;
            Self::check_status(response).await
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> BackendFuture<'a, Vec<PodcastSummary>> {
        Box::pin(async move {
            require_non_empty("query", query)?;
            let response = self
                .client
                .post(self.url(&["api", "search"]))
                .json(&SearchRequest { query })
                .send()
                .await?;
            let results: Vec<PodcastSummary> = Self::parse_response(response).await?;
            for podcast in &results {
                podcast.validate()?;
            }
            Ok(results)
        })
    }

    fn delete_processed_episode<'a>(
        &'a self,
        podcast_title: &'a str,
        episode_title: &'a str,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(&["api", "delete_processed_podcast"]))
                .json(&DeleteProcessedRequest {
                    podcast_title,
                    episode_title,
                })
                .send()
                .await?;
            Self::check_status(response).await
        })
    }

    fn enable_auto_processing<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, f64> {
        Box::pin(async move {
            require_non_empty("feed_url", feed_url)?;
            let response = self
                .client
                .post(self.url(&["api", "auto_process"]))
                .json(&FeedRequest { feed_url })
                .send()
                .await?;
            let parsed: AutoProcessResponse = Self::parse_response(response).await?;
            Ok(parsed.enabled_at)
        })
    }

    fn delete_auto_processed<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            require_non_empty("feed_url", feed_url)?;
            let response = self
                .client
                .delete(self.url(&["api", "delete_auto_processed_podcast"]))
                .query(&[("feed_url", feed_url)])
                .send()
                .await?;
            Self::check_status(response).await
        })
    }

    fn modified_feed<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            require_non_empty("feed_url", feed_url)?;
            let response = self
                .client
                .get(self.url(&["api", "modified_rss", feed_url]))
                .send()
                .await?;
            let response = Self::ensure_success(response).await?;
            Ok(response.text().await?)
        })
    }

    fn prompts(&self) -> BackendFuture<'_, Prompts> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(&["api", "prompts"]))
                .send()
                .await?;
            Self::parse_response(response).await
        })
    }

    fn save_prompts<'a>(&'a self, prompts: &'a Prompts) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(&["api", "prompts"]))
                .json(prompts)
                .send()
                .await?;
            Self::check_status(response).await
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use podcast_core::{JobState, Stage};

    #[test]
    fn feed_url_is_encoded_as_one_segment() {
        let backend = HttpBackend::new("http://localhost:5000/", None).unwrap();
        let url = backend.url(&["api", "modified_rss", "https://example.com/feed.xml?a=1"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/modified_rss/https:%2F%2Fexample.com%2Ffeed.xml%3Fa=1"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let backend = HttpBackend::new("https://host/podcasts", None).unwrap();
        let url = backend.url(&["api", "delete_job", "job-1"]);
        assert_eq!(url.as_str(), "https://host/podcasts/api/delete_job/job-1");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url", None),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            HttpBackend::new("mailto:someone@example.com", None),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn decodes_batch_statuses_and_drops_nulls() {
        let body = br#"{
            "a": {"status":"completed","current_stage":"COMPLETION","progress":100,
                  "message":"Podcast processing completed","timestamp":1718000100.5},
            "b": null
        }"#;
        let statuses = decode_statuses(body).unwrap();
        assert_eq!(statuses.len(), 1);
        let a = &statuses[&JobId::from("a")];
        assert_eq!(a.status, JobState::Completed);
        assert_eq!(a.current_stage, Stage::Completion);
    }

    #[test]
    fn invalid_status_fails_the_batch() {
        let body = br#"{"a": {"status":"in_progress","current_stage":"DOWNLOAD",
                         "progress":140,"timestamp":1.0}}"#;
        assert!(matches!(decode_statuses(body), Err(ApiError::Schema(_))));

        let not_a_map = br#"[1, 2, 3]"#;
        assert!(matches!(decode_statuses(not_a_map), Err(ApiError::Schema(_))));
    }

    #[tokio::test]
    async fn blank_arguments_are_rejected_before_sending() {
        // Nothing listens on port 9; a request that went out would fail as transport.
        let backend = HttpBackend::new("http://127.0.0.1:9", None).unwrap();

        let episodes = backend.fetch_episodes("   ").await;
        assert!(matches!(episodes, Err(ApiError::InvalidInput(_))));

        let job = backend.delete_job(&JobId::from("")).await;
        assert!(matches!(job, Err(ApiError::InvalidInput(_))));

        let search = backend.search("").await;
        assert!(matches!(search, Err(ApiError::InvalidInput(_))));
    }
}
