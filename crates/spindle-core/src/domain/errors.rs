//! Errors raised by the store contract and by task execution.

use thiserror::Error;

use super::ids::JobId;
use super::job::JobStatus;

/// Failure of a store operation.
///
/// Every variant is fatal to the operation that raised it; the worker never
/// retries these internally.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job has no id; it was never persisted")]
    NotPersisted,

    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("job {job_id} is {status}, expected doing")]
    NotDoing { job_id: JobId, status: JobStatus },

    #[error("cannot finish job {job_id} with status {status}")]
    InvalidFinishStatus { job_id: JobId, status: JobStatus },

    #[error("job {job_id} was claimed again; this claim is stale")]
    ClaimLost { job_id: JobId },

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Precondition violations are caller bugs rather than infrastructure trouble.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StoreError::NotPersisted
                | StoreError::UnknownJob(_)
                | StoreError::NotDoing { .. }
                | StoreError::InvalidFinishStatus { .. }
                | StoreError::ClaimLost { .. }
        )
    }
}

/// Failure reported by (or on behalf of) a task handler.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid task arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}
