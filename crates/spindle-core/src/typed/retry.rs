//! Retry policy: turns a task failure into "retry at" or "give up".
//!
//! Policies are attached per task at registration. The worker only knows the
//! contract: (failure, job, now) -> optional next `scheduled_at`.
//!
//! `max_attempts` counts executions, so `Some(3)` means the first run plus at
//! most two retries. `job.attempts` is the number of retries already done.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Job, TaskError};

pub trait RetryPolicy: Send + Sync {
    fn next_attempt(&self, error: &TaskError, job: &Job, now: DateTime<Utc>)
    -> Option<DateTime<Utc>>;
}

impl<F> RetryPolicy for F
where
    F: Fn(&TaskError, &Job, DateTime<Utc>) -> Option<DateTime<Utc>> + Send + Sync,
{
    fn next_attempt(
        &self,
        error: &TaskError,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self(error, job, now)
    }
}

fn has_attempts_left(max_attempts: Option<u32>, job: &Job) -> bool {
    max_attempts.is_none_or(|max| job.attempts.saturating_add(1) < max)
}

/// Longest delay a built-in policy schedules a retry for. Larger delays are
/// clamped, so a runaway backoff still retries instead of failing the job.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn after(now: DateTime<Utc>, delay: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(delay.min(MAX_RETRY_DELAY))
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

/// Never retry (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_attempt(&self, _: &TaskError, _: &Job, _: DateTime<Utc>) -> Option<DateTime<Utc>> {
        None
    }
}

/// Retry after the same delay every time.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for FixedDelay {
    fn next_attempt(&self, _: &TaskError, job: &Job, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !has_attempts_left(self.max_attempts, job) {
            return None;
        }
        after(now, self.delay)
    }
}

/// Exponential backoff: `base_delay * multiplier^(attempt - 1)`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    pub base_delay: Duration,

    pub multiplier: f64,

    pub max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// 2s, 4s, 8s, 16s, ... with 5 executions at most.
    pub fn default_policy() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: Some(5),
        }
    }

    /// Delay before retry number `attempt` (1-indexed).
    ///
    /// Example with base_delay=2s, multiplier=2.0:
    /// - attempt 1 (first failure): 2s
    /// - attempt 2: 4s
    /// - attempt 3: 8s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = base_secs * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_attempt(&self, _: &TaskError, job: &Job, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !has_attempts_left(self.max_attempts, job) {
            return None;
        }
        after(now, self.next_delay(job.attempts.saturating_add(1)))
    }
}
