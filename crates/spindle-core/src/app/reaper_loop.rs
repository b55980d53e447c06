//! ReaperLoop - stall した job の回収
//!
//! A job stays `doing` forever if its worker died mid-execution. The reaper
//! finds jobs that have been `doing` for longer than `stalled_after` and either
//! puts them back to `todo` (immediately claimable) or fails them.
//!
//! Only run this when `stalled_after` is comfortably longer than any task's
//! run time: a job still running on a live worker would be finalized under it,
//! and that worker's own `finish` then fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::{JobStatus, StoreError};
use crate::ports::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalledAction {
    /// Back to `todo`, claimable right away.
    #[default]
    Retry,
    /// Terminal `failed`.
    Fail,
}

impl StalledAction {
    fn status(self) -> JobStatus {
        match self {
            StalledAction::Retry => JobStatus::Todo,
            StalledAction::Fail => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub stalled_after: Duration,
    pub interval: Duration,
    pub action: StalledAction,
    pub queue: Option<String>,
    pub task_name: Option<String>,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            stalled_after: Duration::from_secs(30 * 60),
            interval: Duration::from_secs(60),
            action: StalledAction::Retry,
            queue: None,
            task_name: None,
        }
    }
}

pub struct ReaperLoop {
    store: Arc<dyn JobStore>,
    config: ReaperConfig,
}

impl ReaperLoop {
    pub fn new(store: Arc<dyn JobStore>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// One sweep. Returns how many stalled jobs were finalized.
    ///
    /// A job finished by its worker between listing and finalizing is skipped.
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let stalled = self
            .store
            .list_stalled(
                self.config.stalled_after,
                self.config.queue.as_deref(),
                self.config.task_name.as_deref(),
            )
            .await?;

        let status = self.config.action.status();
        let mut reaped = 0;
        for job in stalled {
            warn!(
                action = "stalled_job",
                job_id = ?job.id.map(|id| id.to_string()),
                task_name = %job.task_name,
                queue = %job.queue,
                to = %status,
                "Job {} stalled for more than {:?}, marking it {status}",
                job.task_name,
                self.config.stalled_after
            );
            match self.store.finish(&job, status, None).await {
                Ok(()) => reaped += 1,
                Err(err) if err.is_precondition() => {
                    debug!(action = "stalled_job", error = %err, "Stalled job already moved on");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reaped)
    }

    /// Sweep every `interval` until `shutdown` turns true (or its sender is gone).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), StoreError> {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
