//! Tracker actor: owns the in-flight set, the status map and the polling loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use api::ProcessingBackend;
use chrono::Utc;
use podcast_core::{Job, JobId, JobState, JobStatus, ResultSnapshot, TrackerEvent, now_secs};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::sync::{broadcast, watch};

use crate::cache::ResultCache;
use crate::messages::{PollOutcome, PollReport, TrackerMessage};
use crate::timer::PollTimer;
use crate::view::TrackerView;

/// Tracker actor arguments.
pub struct TrackerArgs {
    pub backend: Arc<dyn ProcessingBackend>,
    pub cache: Arc<ResultCache>,
    pub poll_interval: Duration,
    pub stall_timeout: Option<Duration>,
    pub view_tx: watch::Sender<TrackerView>,
    pub event_tx: broadcast::Sender<TrackerEvent>,
}

/// State for the tracker actor.
pub struct TrackerState {
    view: TrackerView,
    backend: Arc<dyn ProcessingBackend>,
    cache: Arc<ResultCache>,
    poll_interval: Duration,
    stall_timeout: Option<Duration>,
    /// A batch status request is outstanding.
    poll_in_flight: bool,
    timer: PollTimer,
    /// Jobs already reported as stalled at their current timestamp.
    stalled: HashSet<JobId>,
    view_tx: watch::Sender<TrackerView>,
    event_tx: broadcast::Sender<TrackerEvent>,
}

fn respond<T: Send + 'static>(reply: Option<RpcReplyPort<T>>, value: T) {
    if let Some(reply) = reply {
        let _ = reply.send(value);
    }
}

impl TrackerState {
    fn new(args: TrackerArgs) -> Self {
        let view = args.view_tx.borrow().clone();
        Self {
            view,
            backend: args.backend,
            cache: args.cache,
            poll_interval: args.poll_interval,
            stall_timeout: args.stall_timeout,
            poll_in_flight: false,
            timer: PollTimer::default(),
            stalled: HashSet::new(),
            view_tx: args.view_tx,
            event_tx: args.event_tx,
        }
    }

    fn broadcast(&self, event: TrackerEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Publish the current view to subscribers.
    fn publish(&mut self) {
        self.view.polling = self.timer.is_active();
        self.view_tx.send_replace(self.view.clone());
    }

    /// Run the timer exactly while something is in flight.
    fn sync_timer(&mut self, myself: &ActorRef<TrackerMessage>) {
        if self.view.in_flight.is_empty() {
            if self.timer.is_active() {
                tracing::info!("No jobs in flight, polling stopped");
            }
            self.timer.stop();
        } else if !self.timer.is_active() {
            tracing::info!(jobs = self.view.in_flight.len(), "Polling job statuses");
            self.timer.start(myself.clone(), self.poll_interval);
        }
    }

    fn track(&mut self, job: Job) {
        let job_id = job.job_id.clone();
        if !self.view.job_info.contains_key(&job_id) {
            self.view.in_flight.push(job_id.clone());
        }
        self.view.job_info.insert(job_id.clone(), job);
        self.view
            .statuses
            .entry(job_id)
            .or_insert_with(JobStatus::placeholder);
    }

    /// Drop a job from the in-flight set and the job-info map.
    fn untrack(&mut self, job_id: &JobId) -> Option<Job> {
        self.view.in_flight.retain(|id| id != job_id);
        self.stalled.remove(job_id);
        self.view.job_info.remove(job_id)
    }

    fn replace_results(&mut self, snapshot: ResultSnapshot) {
        self.broadcast(TrackerEvent::ResultsRefreshed {
            processed: snapshot.processed_episodes.len(),
            auto_processed: snapshot.auto_processed_podcasts.len(),
            timestamp: Utc::now(),
        });
        self.view.results = snapshot;
    }

    fn start_poll(
        &mut self,
        myself: &ActorRef<TrackerMessage>,
        reply: Option<RpcReplyPort<PollOutcome>>,
    ) {
        if self.view.in_flight.is_empty() {
            self.sync_timer(myself);
            self.publish();
            respond(reply, PollOutcome::Idle);
            return;
        }
        if self.poll_in_flight {
            tracing::debug!("Previous status poll still outstanding, skipping");
            respond(reply, PollOutcome::Skipped);
            return;
        }

        self.poll_in_flight = true;
        let requested = self.view.in_flight.clone();
        let backend = self.backend.clone();
        let myself = myself.clone();
        tracing::debug!(jobs = requested.len(), "Polling batch status");

        tokio::spawn(async move {
            let result = backend
                .batch_status(&requested)
                .await
                .map_err(|e| e.to_string());
            let _ = myself.send_message(TrackerMessage::PollCompleted {
                requested,
                result,
                reply,
            });
        });
    }

    /// Merge statuses for `requested` jobs, evict the ones that are done and
    /// report what changed.
    fn apply_statuses(
        &mut self,
        myself: &ActorRef<TrackerMessage>,
        requested: &[JobId],
        statuses: &HashMap<JobId, JobStatus>,
    ) -> PollReport {
        let mut report = PollReport::default();
        let mut completed_any = false;

        for job_id in requested {
            // Deleted while the request was outstanding.
            if !self.view.job_info.contains_key(job_id) {
                continue;
            }

            let Some(incoming) = statuses.get(job_id) else {
                tracing::warn!(%job_id, "Backend returned no status, dropping job");
                self.untrack(job_id);
                self.broadcast(TrackerEvent::JobVanished {
                    job_id: job_id.clone(),
                    timestamp: Utc::now(),
                });
                report.vanished.push(job_id.clone());
                continue;
            };

            let accept = self
                .view
                .statuses
                .get(job_id)
                .is_none_or(|existing| existing.superseded_by(incoming));
            if !accept {
                tracing::debug!(%job_id, "Ignoring out-of-order status");
            } else if self.view.statuses.get(job_id) != Some(incoming) {
                let previous = self.view.statuses.insert(job_id.clone(), incoming.clone());
                if previous.is_none_or(|p| p.timestamp != incoming.timestamp) {
                    self.stalled.remove(job_id);
                }
                report.updated.push(job_id.clone());
                self.broadcast(TrackerEvent::JobStatusChanged {
                    job_id: job_id.clone(),
                    status: incoming.clone(),
                    timestamp: Utc::now(),
                });
            }

            let Some(current) = self.view.statuses.get(job_id).filter(|s| s.is_terminal()) else {
                continue;
            };
            let state = current.status;
            let message = current.message.clone();

            self.untrack(job_id);
            if state == JobState::Completed {
                tracing::info!(%job_id, "Job completed");
                completed_any = true;
            } else {
                tracing::warn!(%job_id, %message, "Job failed");
            }
            self.broadcast(TrackerEvent::JobFinished {
                job_id: job_id.clone(),
                state,
                message,
                timestamp: Utc::now(),
            });
            report.finished.push(job_id.clone());
        }

        if completed_any {
            self.spawn_refresh(myself);
            report.refreshing = true;
        }
        self.check_stalls();

        report
    }

    /// Force a Result Store fetch in the background; the snapshot comes back
    /// as [`TrackerMessage::ResultsLoaded`].
    fn spawn_refresh(&self, myself: &ActorRef<TrackerMessage>) {
        let cache = self.cache.clone();
        let event_tx = self.event_tx.clone();
        let myself = myself.clone();

        tokio::spawn(async move {
            match cache.get(true).await {
                Ok(read) => {
                    let _ = myself.send_message(TrackerMessage::ResultsLoaded {
                        snapshot: read.snapshot,
                        reply: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to refresh processed results");
                    let _ = event_tx.send(TrackerEvent::Error {
                        message: format!("Failed to refresh processed results: {}", e),
                        timestamp: Utc::now(),
                    });
                }
            }
        });
    }

    fn check_stalls(&mut self) {
        let Some(threshold) = self.stall_timeout else {
            return;
        };
        let now = now_secs();

        let stalled: Vec<(JobId, f64)> = self
            .view
            .in_flight
            .iter()
            .filter(|id| !self.stalled.contains(*id))
            .filter_map(|id| {
                let status = self.view.statuses.get(id)?;
                status
                    .is_stalled(now, threshold.as_secs_f64())
                    .then(|| (id.clone(), now - status.timestamp))
            })
            .collect();

        for (job_id, last_update_secs) in stalled {
            tracing::warn!(%job_id, last_update_secs, "Job appears stalled");
            self.stalled.insert(job_id.clone());
            self.broadcast(TrackerEvent::JobStalled {
                job_id,
                last_update_secs,
                timestamp: Utc::now(),
            });
        }
    }
}

/// Single owner of tracker state.
pub struct TrackerActor;

impl Actor for TrackerActor {
    type Msg = TrackerMessage;
    type State = TrackerState;
    type Arguments = TrackerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            poll_interval_secs = args.poll_interval.as_secs_f64(),
            "Starting job status tracker"
        );
        Ok(TrackerState::new(args))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.timer.stop();
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TrackerMessage::JobAccepted { job, reply } => {
                tracing::info!(
                    job_id = %job.job_id,
                    episode = %job.episode_title,
                    "Job submitted"
                );
                state.track(job.clone());
                state.broadcast(TrackerEvent::JobSubmitted {
                    job,
                    timestamp: Utc::now(),
                });
                state.sync_timer(&myself);
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::JobDeleted { job_id, reply } => {
                state.untrack(&job_id);
                state.view.statuses.remove(&job_id);
                tracing::info!(%job_id, "Job deleted");
                state.broadcast(TrackerEvent::JobDeleted {
                    job_id,
                    timestamp: Utc::now(),
                });
                state.sync_timer(&myself);
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::Loaded {
                snapshot,
                jobs,
                statuses,
                reply,
            } => {
                state.replace_results(snapshot);
                let requested: Vec<JobId> = jobs.iter().map(|j| j.job_id.clone()).collect();
                for job in jobs {
                    state.track(job);
                }
                tracing::info!(jobs = requested.len(), "Loaded jobs in flight");
                if !requested.is_empty() {
                    state.apply_statuses(&myself, &requested, &statuses);
                }
                state.sync_timer(&myself);
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::EpisodesLoaded {
                feed_url,
                episodes,
                reply,
            } => {
                tracing::debug!(%feed_url, episodes = episodes.len(), "Cached episode list");
                state.view.episodes.insert(feed_url, episodes);
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::ResultsLoaded { snapshot, reply } => {
                state.replace_results(snapshot);
                state.publish();
                respond(reply, ());
            }

            TrackerMessage::AutoProcessingEnabled { entry, info, reply } => {
                tracing::info!(feed_url = %entry.feed_url, "Auto-processing enabled");
                if let Some(info) = info {
                    state
                        .view
                        .results
                        .podcast_info_by_feed
                        .insert(entry.feed_url.clone(), info);
                }
                state.view.results.upsert_auto_processed(entry);
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::AutoProcessingRemoved { feed_url, reply } => {
                if state.view.results.remove_auto_processed(&feed_url) {
                    tracing::info!(%feed_url, "Auto-processing removed");
                }
                state.publish();
                let _ = reply.send(());
            }

            TrackerMessage::Tick => {
                state.start_poll(&myself, None);
            }

            TrackerMessage::PollNow { reply } => {
                state.start_poll(&myself, Some(reply));
            }

            TrackerMessage::PollCompleted {
                requested,
                result,
                reply,
            } => {
                state.poll_in_flight = false;
                let outcome = match result {
                    Ok(statuses) => {
                        PollOutcome::Polled(state.apply_statuses(&myself, &requested, &statuses))
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Batch status poll failed, retrying next tick");
                        state.broadcast(TrackerEvent::PollFailed {
                            error: error.clone(),
                            timestamp: Utc::now(),
                        });
                        PollOutcome::Failed(error)
                    }
                };
                state.sync_timer(&myself);
                state.publish();
                respond(reply, outcome);
            }

            TrackerMessage::Shutdown => {
                tracing::info!("Shutting down job status tracker");
                state.timer.stop();
                state.publish();
                myself.stop(None);
            }
        }

        Ok(())
    }
}
