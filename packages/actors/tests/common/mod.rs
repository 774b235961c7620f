#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actors::{TrackerConfig, TrackerHandle, start_tracker};
use api::{ApiError, BackendFuture, ProcessingBackend};
use podcast_core::{
    Episode, Job, JobId, JobState, JobStatus, PodcastSummary, ProcessedEpisodeRecord, Prompts,
    ResultSnapshot, Stage, TrackerEvent,
};
use storage::{SnapshotFuture, SnapshotSource, StorageError};
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

pub const FEED: &str = "https://example.com/feed.xml";

fn backend_down() -> ApiError {
    ApiError::Backend {
        status: 500,
        message: "backend unavailable".to_string(),
    }
}

pub fn status(state: JobState, stage: Stage, progress: u8, timestamp: f64) -> JobStatus {
    JobStatus {
        status: state,
        current_stage: stage,
        progress,
        message: String::new(),
        timestamp,
        provisional: false,
    }
}

pub fn episodes(count: u32) -> Vec<Episode> {
    (1..=count)
        .map(|number| Episode {
            number,
            title: format!("Episode {number}"),
            published: "2024-06-01".to_string(),
            duration: 1800.0,
        })
        .collect()
}

pub fn record(podcast: &str, episode: &str) -> ProcessedEpisodeRecord {
    ProcessedEpisodeRecord {
        podcast_title: podcast.to_string(),
        episode_title: episode.to_string(),
        feed_url: FEED.to_string(),
        edited_audio_locator: format!("edited/{episode}.mp3"),
        transcript_locator: format!("transcripts/{episode}.json"),
        unwanted_content_locator: format!("unwanted/{episode}.json"),
    }
}

#[derive(Default)]
pub struct Calls {
    pub fetch_episodes: AtomicUsize,
    pub submit: AtomicUsize,
    pub batch_status: AtomicUsize,
    pub current_jobs: AtomicUsize,
    pub delete_job: AtomicUsize,
    pub enable_auto: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct Script {
    episodes: HashMap<String, Vec<Episode>>,
    statuses: HashMap<JobId, JobStatus>,
    current_jobs: Vec<Job>,
    next_job: u32,
    next_enabled_at: f64,
    fail_submit: bool,
    fail_batch: bool,
    fail_delete: bool,
    fail_prompts: bool,
    hold_batch: Option<Arc<Notify>>,
    prompts: Prompts,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            episodes: HashMap::new(),
            statuses: HashMap::new(),
            current_jobs: Vec::new(),
            next_job: 0,
            next_enabled_at: 0.0,
            fail_submit: false,
            fail_batch: false,
            fail_delete: false,
            fail_prompts: false,
            hold_batch: None,
            prompts: Prompts::new("Detect promotional segments", "Detect promotional segments"),
        }
    }
}

/// Scripted in-memory processing backend.
#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<Script>,
    pub calls: Calls,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.with_episodes(FEED, episodes(5));
        Arc::new(backend)
    }

    pub fn with_episodes(&self, feed_url: &str, list: Vec<Episode>) {
        self.script
            .lock()
            .unwrap()
            .episodes
            .insert(feed_url.to_string(), list);
    }

    /// Status returned for `job_id` by subsequent batch requests.
    pub fn set_status(&self, job_id: &JobId, status: JobStatus) {
        self.script
            .lock()
            .unwrap()
            .statuses
            .insert(job_id.clone(), status);
    }

    pub fn clear_status(&self, job_id: &JobId) {
        self.script.lock().unwrap().statuses.remove(job_id);
    }

    pub fn set_current_jobs(&self, jobs: Vec<Job>) {
        self.script.lock().unwrap().current_jobs = jobs;
    }

    pub fn fail_submit(&self, fail: bool) {
        self.script.lock().unwrap().fail_submit = fail;
    }

    pub fn fail_batch(&self, fail: bool) {
        self.script.lock().unwrap().fail_batch = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.script.lock().unwrap().fail_delete = fail;
    }

    pub fn fail_prompts(&self, fail: bool) {
        self.script.lock().unwrap().fail_prompts = fail;
    }

    /// Make batch requests wait until the returned gate is notified.
    pub fn hold_batch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().unwrap().hold_batch = Some(gate.clone());
        gate
    }

    pub fn release_batch(&self) {
        if let Some(gate) = self.script.lock().unwrap().hold_batch.take() {
            gate.notify_one();
        }
    }
}

impl ProcessingBackend for FakeBackend {
    fn fetch_episodes<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, Vec<Episode>> {
        Box::pin(async move {
            self.calls.fetch_episodes.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .episodes
                .get(feed_url)
                .cloned()
                .ok_or_else(|| ApiError::Backend {
                    status: 400,
                    message: "Invalid RSS URL".to_string(),
                })
        })
    }

    fn submit_job<'a>(
        &'a self,
        _feed_url: &'a str,
        _episode_index: usize,
    ) -> BackendFuture<'a, JobId> {
        Box::pin(async move {
            self.calls.submit.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.fail_submit {
                return Err(backend_down());
            }
            script.next_job += 1;
            Ok(JobId::new(format!("job-{}", script.next_job)))
        })
    }

    fn batch_status<'a>(
        &'a self,
        job_ids: &'a [JobId],
    ) -> BackendFuture<'a, HashMap<JobId, JobStatus>> {
        Box::pin(async move {
            self.calls.batch_status.fetch_add(1, Ordering::SeqCst);
            let gate = self.script.lock().unwrap().hold_batch.clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let script = self.script.lock().unwrap();
            if script.fail_batch {
                return Err(backend_down());
            }
            Ok(job_ids
                .iter()
                .filter_map(|id| script.statuses.get(id).map(|s| (id.clone(), s.clone())))
                .collect())
        })
    }

    fn current_jobs(&self) -> BackendFuture<'_, Vec<Job>> {
        Box::pin(async move {
            self.calls.current_jobs.fetch_add(1, Ordering::SeqCst);
            Ok(self.script.lock().unwrap().current_jobs.clone())
        })
    }

    fn delete_job<'a>(&'a self, job_id: &'a JobId) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.calls.delete_job.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.fail_delete {
                return Err(backend_down());
            }
            script.statuses.remove(job_id);
            Ok(())
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> BackendFuture<'a, Vec<PodcastSummary>> {
        Box::pin(async move {
            Ok(vec![PodcastSummary {
                uuid: "p-1".to_string(),
                name: format!("{query} show"),
                description: String::new(),
                image_url: None,
                feed_url: FEED.to_string(),
            }])
        })
    }

    fn delete_processed_episode<'a>(
        &'a self,
        _podcast_title: &'a str,
        _episode_title: &'a str,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn enable_auto_processing<'a>(&'a self, _feed_url: &'a str) -> BackendFuture<'a, f64> {
        Box::pin(async move {
            self.calls.enable_auto.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            script.next_enabled_at += 1.0;
            Ok(1_718_000_000.0 + script.next_enabled_at)
        })
    }

    fn delete_auto_processed<'a>(&'a self, _feed_url: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn modified_feed<'a>(&'a self, feed_url: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move { Ok(format!("<rss><channel><link>{feed_url}</link></channel></rss>")) })
    }

    fn prompts(&self) -> BackendFuture<'_, Prompts> {
        Box::pin(async move { Ok(self.script.lock().unwrap().prompts.clone()) })
    }

    fn save_prompts<'a>(&'a self, prompts: &'a Prompts) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            if script.fail_prompts {
                return Err(backend_down());
            }
            script.prompts = prompts.clone();
            Ok(())
        })
    }
}

/// In-memory Result Store that counts fetches.
#[derive(Default)]
pub struct FakeSnapshotSource {
    snapshot: Mutex<ResultSnapshot>,
    fail: Mutex<bool>,
    pub fetches: AtomicUsize,
}

impl FakeSnapshotSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_snapshot(&self, snapshot: ResultSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for FakeSnapshotSource {
    fn fetch_snapshot(&self) -> SnapshotFuture<'_> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock().unwrap() {
                return Err(StorageError::InvalidConfig("store offline".to_string()));
            }
            Ok(self.snapshot.lock().unwrap().clone())
        })
    }
}

/// Config whose timer never fires during a test; polls are driven by `poll_now`.
pub fn manual_config() -> TrackerConfig {
    TrackerConfig {
        poll_interval: Duration::from_secs(3600),
        ..TrackerConfig::default()
    }
}

pub struct Harness {
    pub tracker: TrackerHandle,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<FakeSnapshotSource>,
    pub actor: JoinHandle<()>,
}

pub async fn start(config: TrackerConfig) -> Result<Harness, ractor::SpawnErr> {
    let backend = FakeBackend::new();
    let store = FakeSnapshotSource::new();
    let (tracker, actor) = start_tracker(&config, backend.clone(), store.clone()).await?;
    Ok(Harness {
        tracker,
        backend,
        store,
        actor,
    })
}

/// Wait for the first event matching `pred`.
pub async fn next_event(
    events: &mut broadcast::Receiver<TrackerEvent>,
    pred: impl Fn(&TrackerEvent) -> bool,
) -> Option<TrackerEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
