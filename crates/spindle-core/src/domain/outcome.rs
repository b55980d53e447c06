//! Outcome of executing one claimed job.
//!
//! This is what the worker hands to `JobStore::finish`. It does not know about
//! handlers or stores; it only fixes the "shape" of the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Handler returned normally. The value is kept for logs only.
    Succeeded { result: serde_json::Value },

    /// Terminal failure: handler failed without retry, or the task was not found.
    Failed { reason: String },

    /// Handler failed and the retry policy rescheduled it.
    Retry {
        reason: String,
        scheduled_at: DateTime<Utc>,
    },
}

impl Outcome {
    pub fn success(result: serde_json::Value) -> Self {
        Outcome::Succeeded { result }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn retry(reason: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Outcome::Retry {
            reason: reason.into(),
            scheduled_at,
        }
    }

    /// Status and next schedule to finalize the job with.
    pub fn finish_args(&self) -> (JobStatus, Option<DateTime<Utc>>) {
        match self {
            Outcome::Succeeded { .. } => (JobStatus::Succeeded, None),
            Outcome::Failed { .. } => (JobStatus::Failed, None),
            Outcome::Retry { scheduled_at, .. } => (JobStatus::Todo, Some(*scheduled_at)),
        }
    }
}
