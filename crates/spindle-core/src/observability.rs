//! Per-job log context.
//!
//! The worker keeps one `JobContext` for the job it is running. It is what the
//! `start_job` / `job_success` / `job_error` lines carry and what a stop request
//! reports as the job still being waited on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobArgs, JobId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobContext {
    pub job_id: Option<JobId>,
    pub task_name: String,
    pub queue: String,
    pub lock: Option<String>,
    pub attempts: u32,
    pub args: JobArgs,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub end_timestamp: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl JobContext {
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id,
            task_name: job.task_name.clone(),
            queue: job.queue.clone(),
            lock: job.lock.clone(),
            attempts: job.attempts,
            args: job.args.clone(),
            scheduled_at: job.scheduled_at,
            start_timestamp: None,
            end_timestamp: None,
            duration_seconds: None,
        }
    }

    pub fn start(&mut self, at: DateTime<Utc>) {
        self.start_timestamp = Some(at);
        self.end_timestamp = None;
        self.duration_seconds = None;
    }

    /// Records the end time and the duration since `start`, if started.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.end_timestamp = Some(at);
        self.duration_seconds = self
            .start_timestamp
            .map(|start| (at - start).num_milliseconds() as f64 / 1000.0);
    }

    /// `task_name[job-…](a=1, b=2)`
    pub fn call_string(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let id = self
            .job_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{}[{}]({})", self.task_name, id, args.join(", "))
    }
}

impl std::fmt::Display for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str(&self.call_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn job() -> Job {
        let mut job = Job::new("add").with_arg("a", 1).with_arg("b", 2);
        job.id = Some(JobId::from_ulid(Ulid::nil()));
        job
    }

    #[test]
    fn duration_is_measured_between_start_and_finish() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut ctx = JobContext::new(&job());
        ctx.start(start);
        ctx.finish(start + Duration::milliseconds(1500));
        assert_eq!(ctx.duration_seconds, Some(1.5));
    }

    #[test]
    fn finish_without_start_has_no_duration() {
        let mut ctx = JobContext::new(&job());
        ctx.finish(Utc::now());
        assert!(ctx.end_timestamp.is_some());
        assert_eq!(ctx.duration_seconds, None);
    }

    #[test]
    fn call_string_lists_args() {
        let ctx = JobContext::new(&job());
        assert_eq!(
            ctx.call_string(),
            "add[job-00000000000000000000000000](a=1, b=2)"
        );
    }

    #[test]
    fn display_is_json() {
        let ctx = JobContext::new(&job());
        let parsed: serde_json::Value = serde_json::from_str(&ctx.to_string()).unwrap();
        assert_eq!(parsed["task_name"], "add");
        assert_eq!(parsed["args"]["b"], 2);
    }
}
