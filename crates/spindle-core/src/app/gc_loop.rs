//! GcLoop - 終了済み job の削除
//!
//! Periodically calls `purge_finished`. `succeeded` jobs only unless
//! `include_failed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::domain::StoreError;
use crate::ports::JobStore;

#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Age of the job's latest event.
    pub older_than: Duration,
    pub interval: Duration,
    pub queue: Option<String>,
    pub include_failed: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            older_than: Duration::from_secs(30 * 24 * 3600),
            interval: Duration::from_secs(3600),
            queue: None,
            include_failed: false,
        }
    }
}

pub struct GcLoop {
    store: Arc<dyn JobStore>,
    config: GcConfig,
}

impl GcLoop {
    pub fn new(store: Arc<dyn JobStore>, config: GcConfig) -> Self {
        Self { store, config }
    }

    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let deleted = self
            .store
            .purge_finished(
                self.config.older_than,
                self.config.queue.as_deref(),
                self.config.include_failed,
            )
            .await?;
        if deleted > 0 {
            info!(action = "purge_finished", deleted, "Deleted {deleted} finished jobs");
        }
        Ok(deleted)
    }

    /// Purge every `interval` until `shutdown` turns true (or its sender is gone).
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, JobStatus, QueueFilter};
    use crate::impls::InMemoryJobStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    async fn finished(store: &InMemoryJobStore, status: JobStatus) {
        store.enqueue(Job::new("t")).await.unwrap();
        let job = store.claim(&QueueFilter::Any).await.unwrap().unwrap();
        store.finish(&job, status, None).await.unwrap();
    }

    #[tokio::test]
    async fn purges_old_succeeded_jobs() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(InMemoryJobStore::with_clock(clock.clone()));
        finished(&store, JobStatus::Succeeded).await;
        finished(&store, JobStatus::Failed).await;

        let gc = GcLoop::new(
            store.clone(),
            GcConfig {
                older_than: Duration::from_secs(3600),
                ..GcConfig::default()
            },
        );

        assert_eq!(gc.run_once().await.unwrap(), 0);

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(gc.run_once().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn include_failed_purges_both() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(InMemoryJobStore::with_clock(clock.clone()));
        finished(&store, JobStatus::Succeeded).await;
        finished(&store, JobStatus::Failed).await;
        clock.advance(chrono::Duration::days(40));

        let gc = GcLoop::new(
            store.clone(),
            GcConfig {
                include_failed: true,
                ..GcConfig::default()
            },
        );
        assert_eq!(gc.run_once().await.unwrap(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn run_exits_when_sender_dropped() {
        let store = Arc::new(InMemoryJobStore::new());
        let (tx, rx) = watch::channel(false);
        let running = tokio::spawn(GcLoop::new(store, GcConfig::default()).run(rx));
        drop(tx);

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("gc loop should stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
