//! JobStore port - ジョブ状態の正本（source of truth）
//!
//! The worker only ever talks to a store through this trait. Implementations
//! must make `enqueue`, `claim` and `finish` atomic; that atomicity, not the
//! notification mechanism, is what keeps two workers from running the same job
//! or two jobs sharing a lock.
//!
//! Waking up is a separate concern: `subscribe` + `await_notification` only tell
//! a worker that it may be worth claiming again. Several workers can be woken
//! by the same enqueue and race on `claim`; the losers get `None`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobId, JobStatus, QueueFilter, StoreError};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist `job` as `todo` and return its new id. Any `id`/`status` already on
    /// `job` is ignored.
    async fn enqueue(&self, job: Job) -> Result<JobId, StoreError>;

    /// Atomically move the oldest eligible job to `doing` and return it.
    ///
    /// Eligible: `todo`, `scheduled_at` unset or not in the future, queue matched
    /// by `queues`, and no `doing` job holds the same lock. `Ok(None)` means
    /// nothing is claimable right now. The returned copy carries a fresh
    /// claim token in `Job::claim`.
    async fn claim(&self, queues: &QueueFilter) -> Result<Option<Job>, StoreError>;

    /// Finalize a `doing` job as `succeeded`, `failed`, or back to `todo`
    /// (retry, at `scheduled_at` or immediately when `None`).
    ///
    /// `job.claim` must be the token of the current claim. A copy from an
    /// earlier claim of a job that was requeued and claimed again fails with
    /// [`StoreError::ClaimLost`] and leaves the row untouched.
    async fn finish(
        &self,
        job: &Job,
        status: JobStatus,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Jobs `doing` for longer than `older_than`. Read-only.
    async fn list_stalled(
        &self,
        older_than: Duration,
        queue: Option<&str>,
        task_name: Option<&str>,
    ) -> Result<Vec<Job>, StoreError>;

    /// Delete terminal jobs whose last event is older than `older_than`.
    /// Only `succeeded` jobs unless `include_failed`. Returns how many were deleted.
    async fn purge_finished(
        &self,
        older_than: Duration,
        queue: Option<&str>,
        include_failed: bool,
    ) -> Result<usize, StoreError>;

    /// Listen on the channels of `queues` (see [`QueueFilter::channels`]).
    async fn subscribe(&self, queues: &QueueFilter) -> Result<(), StoreError>;

    /// Block until a subscribed channel fires, `interrupt` is called, or
    /// `timeout` elapses. Never busy-polls.
    async fn await_notification(&self, timeout: Duration) -> Result<(), StoreError>;

    /// Wake a pending (or the next) `await_notification`.
    ///
    /// Must not block: this is called from stop handlers.
    fn interrupt(&self);

    /// Release the session. Idempotent.
    async fn close(&self) -> Result<(), StoreError>;

    /// Open another session on the same backend, with its own subscriptions and
    /// interrupt state. Each worker gets one.
    async fn connect(&self) -> Result<Arc<dyn JobStore>, StoreError>;
}
