//! Job lifecycle events recorded by a store.
//!
//! `purge_finished` ages a job by its latest event, so a store keeps at least
//! the last one per job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Deferred,
    Scheduled,
    Started,
    DeferredForRetry,
    Succeeded,
    Failed,
}

impl JobEventKind {
    /// Event recorded when a job is finished with `status`.
    pub fn for_finish(status: JobStatus) -> Option<Self> {
        match status {
            JobStatus::Todo => Some(JobEventKind::DeferredForRetry),
            JobStatus::Succeeded => Some(JobEventKind::Succeeded),
            JobStatus::Failed => Some(JobEventKind::Failed),
            JobStatus::Doing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub kind: JobEventKind,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(kind: JobEventKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }
}
