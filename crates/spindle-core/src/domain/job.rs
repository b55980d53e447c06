//! Job: the unit of work and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ClaimId, JobId};

/// Queue used when a job does not name one.
pub const DEFAULT_QUEUE: &str = "default";

/// Keyword arguments handed to the task (keys are unique).
pub type JobArgs = serde_json::Map<String, serde_json::Value>;

/// Job status.
///
/// State transitions:
/// - Todo -> Doing (claim only)
/// - Doing -> Succeeded | Failed (finish)
/// - Doing -> Todo (finish with a retry schedule)
///
/// Succeeded / Failed stay put until purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Todo,
    Doing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Todo => "todo",
            JobStatus::Doing => "doing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as seen outside the store.
///
/// `id` is `None` until the store persisted the job. A worker only ever holds a
/// copy; the store's row is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Option<JobId>,
    pub task_name: String,
    #[serde(default)]
    pub args: JobArgs,
    pub lock: Option<String>,
    pub queue: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    #[serde(default)]
    pub attempts: u32,
    /// Set by `claim` on the copy handed to the worker. `finish` only accepts
    /// the token of the current claim.
    #[serde(default)]
    pub claim: Option<ClaimId>,
}

impl Job {
    /// New, not yet persisted job on the default queue.
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            id: None,
            task_name: task_name.into(),
            args: JobArgs::new(),
            lock: None,
            queue: DEFAULT_QUEUE.to_string(),
            scheduled_at: None,
            status: JobStatus::Todo,
            attempts: 0,
            claim: None,
        }
    }

    pub fn with_args(mut self, args: JobArgs) -> Self {
        self.args = args;
        self
    }

    /// Set a single keyword argument (overrides an existing key).
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn with_lock(mut self, lock: impl Into<String>) -> Self {
        self.lock = Some(lock.into());
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Copy of this job (id, lock, queue, schedule kept) whose args are
    /// `self.args` overridden by `overrides`.
    pub fn merged_args(&self, overrides: JobArgs) -> Self {
        let mut job = self.clone();
        job.args.extend(overrides);
        job
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Flat JSON description used as log context.
    pub fn context(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.map(|id| id.to_string()),
            "task_name": self.task_name,
            "args": self.args,
            "lock": self.lock,
            "queue": self.queue,
            "scheduled_at": self.scheduled_at.map(|at| at.to_rfc3339()),
            "attempts": self.attempts,
        })
    }
}
