//! Polling timer owned by the tracker actor.

use std::time::Duration;

use ractor::ActorRef;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::messages::TrackerMessage;

/// Sends [`TrackerMessage::Tick`] to the tracker at a fixed period while active.
#[derive(Default)]
pub(crate) struct PollTimer {
    task: Option<JoinHandle<()>>,
}

impl PollTimer {
    /// Start ticking; no-op when already running. The first tick fires one
    /// full period after start.
    pub fn start(&mut self, tracker: ActorRef<TrackerMessage>, period: Duration) {
        if self.is_active() {
            return;
        }

        tracing::debug!(period_secs = period.as_secs_f64(), "Starting status poll timer");
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tracker.send_message(TrackerMessage::Tick).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!("Stopping status poll timer");
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
