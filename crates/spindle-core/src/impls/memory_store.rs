//! In-memory job store.
//!
//! Jobs live only as long as the process. This is the reference implementation
//! of [`JobStore`] used by tests and the demo CLI; a durable store has to honour
//! the same semantics.
//!
//! One `InMemoryJobStore` value is one *session* on a shared backend, like a
//! database connection: it owns its subscriptions and its wake-up signal.
//! [`JobStore::connect`] opens another session on the same backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use crate::domain::{
    Job, JobEvent, JobEventKind, JobId, JobStatus, QueueFilter, StoreError, channels_for_enqueue,
};
use crate::ports::{Clock, IdGenerator, JobStore, SystemClock, UlidGenerator};

/// Row of the store: the job plus bookkeeping the job itself does not carry.
#[derive(Debug, Clone)]
struct JobRow {
    job: Job,
    started_at: Option<DateTime<Utc>>,
    events: Vec<JobEvent>,
}

impl JobRow {
    fn is_claimable(&self, queues: &QueueFilter, now: DateTime<Utc>, locks: &HashSet<String>) -> bool {
        self.job.status == JobStatus::Todo
            && queues.matches(&self.job.queue)
            && self.job.scheduled_at.is_none_or(|at| at <= now)
            && self.job.lock.as_ref().is_none_or(|lock| !locks.contains(lock))
    }

    fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.events.iter().map(|e| e.at).max()
    }
}

/// A session listening on some channels.
struct Listener {
    channels: HashSet<String>,
    session: Weak<Session>,
}

struct Session {
    wakeup: Notify,
    closed: AtomicBool,
}

impl Session {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            wakeup: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }
}

#[derive(Default)]
struct StoreState {
    /// Rows keyed by insertion sequence: iteration order is claim order.
    rows: BTreeMap<u64, JobRow>,

    index: HashMap<JobId, u64>,

    next_seq: u64,

    listeners: Vec<Listener>,
}

impl StoreState {
    fn current_locks(&self) -> HashSet<String> {
        self.rows
            .values()
            .filter(|row| row.job.status == JobStatus::Doing)
            .filter_map(|row| row.job.lock.clone())
            .collect()
    }

    fn row_mut(&mut self, job_id: JobId) -> Result<&mut JobRow, StoreError> {
        let seq = *self.index.get(&job_id).ok_or(StoreError::UnknownJob(job_id))?;
        self.rows.get_mut(&seq).ok_or(StoreError::UnknownJob(job_id))
    }

    fn row(&self, job_id: JobId) -> Option<&JobRow> {
        self.index.get(&job_id).and_then(|seq| self.rows.get(seq))
    }

    /// Sessions listening on any of `channels`. Drops listeners whose session is gone.
    fn listeners_for(&mut self, channels: &[String]) -> Vec<Arc<Session>> {
        self.listeners.retain(|l| l.session.strong_count() > 0);
        self.listeners
            .iter()
            .filter(|l| channels.iter().any(|c| l.channels.contains(c)))
            .filter_map(|l| l.session.upgrade())
            .collect()
    }

    fn remove_row(&mut self, seq: u64) {
        if let Some(row) = self.rows.remove(&seq)
            && let Some(id) = row.job.id
        {
            self.index.remove(&id);
        }
    }
}

struct Backend {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

/// In-memory job store session.
pub struct InMemoryJobStore {
    backend: Arc<Backend>,
    session: Arc<Session>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store whose notion of "now" comes from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let ids = Box::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            backend: Arc::new(Backend {
                state: Mutex::new(StoreState::default()),
                clock,
                ids,
            }),
            session: Session::new(),
        }
    }

    /// New session on the same backend.
    pub fn session(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: Session::new(),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.session.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        self.backend.clock.now()
    }

    /// Current persisted state of a job.
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        let state = self.backend.state.lock().await;
        state.row(job_id).map(|row| row.job.clone())
    }

    /// When the job was last claimed (cleared when it goes back to `todo`).
    pub async fn started_at(&self, job_id: JobId) -> Option<DateTime<Utc>> {
        let state = self.backend.state.lock().await;
        state.row(job_id).and_then(|row| row.started_at)
    }

    pub async fn events(&self, job_id: JobId) -> Vec<JobEvent> {
        let state = self.backend.state.lock().await;
        state
            .row(job_id)
            .map(|row| row.events.clone())
            .unwrap_or_default()
    }

    /// Locks held by `doing` jobs.
    pub async fn current_locks(&self) -> HashSet<String> {
        self.backend.state.lock().await.current_locks()
    }

    pub async fn finished_jobs(&self) -> Vec<Job> {
        let state = self.backend.state.lock().await;
        state
            .rows
            .values()
            .filter(|row| row.job.status.is_terminal())
            .map(|row| row.job.clone())
            .collect()
    }

    pub async fn counts_by_status(&self) -> HashMap<JobStatus, usize> {
        let state = self.backend.state.lock().await;
        let mut counts = HashMap::new();
        for row in state.rows.values() {
            *counts.entry(row.job.status).or_insert(0) += 1;
        }
        counts
    }

    pub async fn len(&self) -> usize {
        self.backend.state.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget every job (subscriptions are kept).
    pub async fn reset(&self) {
        let mut state = self.backend.state.lock().await;
        state.rows.clear();
        state.index.clear();
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `now - older_than`, saturating at the earliest representable instant.
fn threshold(now: DateTime<Utc>, older_than: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(older_than)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, job: Job) -> Result<JobId, StoreError> {
        self.ensure_open()?;
        let now = self.now();
        let job_id = self.backend.ids.generate_job_id();

        let mut events = Vec::new();
        if let Some(at) = job.scheduled_at {
            events.push(JobEvent::new(JobEventKind::Scheduled, at));
        }
        events.push(JobEvent::new(JobEventKind::Deferred, now));

        let channels = channels_for_enqueue(&job.queue);
        let row = JobRow {
            job: Job {
                id: Some(job_id),
                status: JobStatus::Todo,
                attempts: 0,
                claim: None,
                ..job
            },
            started_at: None,
            events,
        };

        let to_wake = {
            let mut state = self.backend.state.lock().await;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.rows.insert(seq, row);
            state.index.insert(job_id, seq);
            state.listeners_for(&channels)
        };

        // Notify outside the lock
        for session in to_wake {
            session.wakeup.notify_one();
        }

        Ok(job_id)
    }

    async fn claim(&self, queues: &QueueFilter) -> Result<Option<Job>, StoreError> {
        self.ensure_open()?;
        let now = self.now();
        let mut state = self.backend.state.lock().await;
        let locks = state.current_locks();

        let Some(row) = state
            .rows
            .values_mut()
            .find(|row| row.is_claimable(queues, now, &locks))
        else {
            return Ok(None);
        };

        row.job.status = JobStatus::Doing;
        row.job.claim = Some(self.backend.ids.generate_claim_id());
        row.started_at = Some(now);
        row.events.push(JobEvent::new(JobEventKind::Started, now));
        Ok(Some(row.job.clone()))
    }

    async fn finish(
        &self,
        job: &Job,
        status: JobStatus,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let job_id = job.id.ok_or(StoreError::NotPersisted)?;
        let Some(event) = JobEventKind::for_finish(status) else {
            return Err(StoreError::InvalidFinishStatus { job_id, status });
        };
        let now = self.now();

        let to_wake = {
            let mut state = self.backend.state.lock().await;
            let row = state.row_mut(job_id)?;
            if row.job.status != JobStatus::Doing {
                return Err(StoreError::NotDoing {
                    job_id,
                    status: row.job.status,
                });
            }
            if row.job.claim != job.claim {
                return Err(StoreError::ClaimLost { job_id });
            }

            row.job.status = status;
            row.job.claim = None;
            if status == JobStatus::Todo {
                row.job.attempts += 1;
                row.job.scheduled_at = scheduled_at;
                row.started_at = None;
                if let Some(at) = scheduled_at {
                    row.events.push(JobEvent::new(JobEventKind::Scheduled, at));
                }
            }
            row.events.push(JobEvent::new(event, now));

            if status == JobStatus::Todo {
                let channels = channels_for_enqueue(&row.job.queue);
                state.listeners_for(&channels)
            } else {
                Vec::new()
            }
        };

        for session in to_wake {
            session.wakeup.notify_one();
        }

        Ok(())
    }

    async fn list_stalled(
        &self,
        older_than: Duration,
        queue: Option<&str>,
        task_name: Option<&str>,
    ) -> Result<Vec<Job>, StoreError> {
        self.ensure_open()?;
        let before = threshold(self.now(), older_than);
        let state = self.backend.state.lock().await;

        Ok(state
            .rows
            .values()
            .filter(|row| row.job.status == JobStatus::Doing)
            .filter(|row| row.started_at.is_some_and(|at| at < before))
            .filter(|row| queue.is_none_or(|q| row.job.queue == q))
            .filter(|row| task_name.is_none_or(|t| row.job.task_name == t))
            .map(|row| row.job.clone())
            .collect())
    }

    async fn purge_finished(
        &self,
        older_than: Duration,
        queue: Option<&str>,
        include_failed: bool,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let before = threshold(self.now(), older_than);
        let mut state = self.backend.state.lock().await;

        let doomed: Vec<u64> = state
            .rows
            .iter()
            .filter(|(_, row)| match row.job.status {
                JobStatus::Succeeded => true,
                JobStatus::Failed => include_failed,
                _ => false,
            })
            .filter(|(_, row)| row.last_event_at().is_some_and(|at| at < before))
            .filter(|(_, row)| queue.is_none_or(|q| row.job.queue == q))
            .map(|(seq, _)| *seq)
            .collect();

        for seq in &doomed {
            state.remove_row(*seq);
        }
        Ok(doomed.len())
    }

    async fn subscribe(&self, queues: &QueueFilter) -> Result<(), StoreError> {
        self.ensure_open()?;
        let channels = queues.channels();
        let mut state = self.backend.state.lock().await;

        let existing = state
            .listeners
            .iter_mut()
            .find(|l| std::ptr::eq(l.session.as_ptr(), Arc::as_ptr(&self.session)));
        match existing {
            Some(listener) => listener.channels.extend(channels),
            None => state.listeners.push(Listener {
                channels: channels.into_iter().collect(),
                session: Arc::downgrade(&self.session),
            }),
        }
        Ok(())
    }

    async fn await_notification(&self, timeout: Duration) -> Result<(), StoreError> {
        self.ensure_open()?;
        // timing out is a normal wake-up, not an error
        let _ = tokio::time::timeout(timeout, self.session.wakeup.notified()).await;
        Ok(())
    }

    fn interrupt(&self) {
        self.session.wakeup.notify_one();
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.session.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        {
            let mut state = self.backend.state.lock().await;
            let me = Arc::as_ptr(&self.session);
            state.listeners.retain(|l| !std::ptr::eq(l.session.as_ptr(), me));
        }
        self.session.wakeup.notify_one();
        Ok(())
    }

    async fn connect(&self) -> Result<Arc<dyn JobStore>, StoreError> {
        self.ensure_open()?;
        Ok(Arc::new(self.session()))
    }
}
