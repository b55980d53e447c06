//! Worker - claim → resolve → execute → finish を繰り返す実行ループ
//!
//! # 状態遷移
//! `subscribed → draining → waiting → draining → … → stopped`
//!
//! - **draining**: claim できる job がなくなるまで 1 件ずつ実行
//! - **waiting**: `await_notification(wait_timeout)` で通知か timeout を待つ
//! - **stop**: 各 iteration の先頭（= 直前の job の finish 後）でのみ判定する。
//!   実行中の job は必ず最後まで走らせて finish してから抜ける
//!
//! One job runs at a time per worker. The handler runs on its own tokio task
//! so that a panic becomes a job failure instead of taking the worker down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::domain::{Job, JobArgs, JobId, JobStatus, Outcome, StoreError, TaskError, WorkerId};
use crate::error::SpindleError;
use crate::observability::JobContext;
use crate::ports::{Clock, IdGenerator, JobStore, SystemClock, UlidGenerator};
use crate::typed::{DynHandler, NoLoader, RegisteredTask, TaskLoader, TaskRegistry, TaskResolver};

/// Result of one iteration of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A job was claimed, executed and finalized with `status`.
    Processed { job_id: JobId, status: JobStatus },

    /// The job was executed, but it had been requeued and claimed again in
    /// the meantime, so its result was discarded.
    ClaimLost { job_id: JobId },

    /// Nothing claimable right now.
    NoJobAvailable,

    /// Stop was requested before claiming.
    StopRequested,
}

/// State shared between a worker and its stop handles.
#[derive(Default)]
struct StopState {
    requested: AtomicBool,
    current: Mutex<Option<JobContext>>,
}

/// Requests a graceful stop. Cheap to clone, safe to call from a signal
/// handler or from inside a task.
#[derive(Clone)]
pub struct StopHandle {
    worker: String,
    state: Arc<StopState>,
    store: Arc<dyn JobStore>,
}

impl StopHandle {
    /// Never blocks.
    pub fn stop(&self) {
        self.state.requested.store(true, Ordering::SeqCst);

        // the worker only holds this lock for an instant; skip the context
        // rather than wait for it
        let current = self
            .state
            .current
            .try_lock()
            .ok()
            .and_then(|guard| guard.clone());
        match current {
            Some(ctx) => info!(
                action = "stopping_worker",
                worker = %self.worker,
                task_name = %ctx.task_name,
                "Stop requested, waiting for current job to finish: {}",
                ctx.call_string()
            ),
            None => info!(action = "stopping_worker", worker = %self.worker, "Stop requested"),
        }

        self.store.interrupt();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("worker", &self.worker)
            .field("requested", &self.is_stop_requested())
            .finish()
    }
}

pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    store: Arc<dyn JobStore>,
    resolver: TaskResolver,
    clock: Arc<dyn Clock>,
    stop: Arc<StopState>,
}

impl Worker {
    /// `store` should be a session owned by this worker (see [`JobStore::connect`]).
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<TaskRegistry>, config: WorkerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            id: UlidGenerator::new(Arc::clone(&clock)).generate_worker_id(),
            config,
            store,
            resolver: TaskResolver::new(registry, Arc::new(NoLoader)),
            clock,
            stop: Arc::new(StopState::default()),
        }
    }

    /// Fallback for tasks missing from the registry.
    pub fn with_loader(mut self, loader: Arc<dyn TaskLoader>) -> Self {
        let declared = Arc::clone(self.resolver.declared());
        self.resolver = TaskResolver::new(declared, loader);
        self
    }

    /// Clock handed to retry policies and used for job timings. Should be the
    /// store's clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            worker: self.config.name.clone(),
            state: Arc::clone(&self.stop),
            store: Arc::clone(&self.store),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.requested.load(Ordering::SeqCst)
    }

    fn set_current(&self, ctx: Option<JobContext>) {
        *self.stop.current.lock().unwrap_or_else(|e| e.into_inner()) = ctx;
    }

    /// Run until stopped. Store failures end the loop and are returned.
    pub async fn run(&mut self) -> Result<(), SpindleError> {
        info!(
            action = "start_worker",
            worker = %self.config.name,
            worker_id = %self.id,
            queues = %self.config.queues,
            "Starting worker on queues: {}",
            self.config.queues
        );

        self.store.subscribe(&self.config.queues).await?;

        loop {
            self.process_jobs_once().await?;
            if self.stop_requested() {
                break;
            }

            debug!(
                action = "waiting_for_jobs",
                worker = %self.config.name,
                "Waiting for new jobs"
            );
            self.store.await_notification(self.config.wait_timeout).await?;
        }

        info!(action = "stopped_worker", worker = %self.config.name, "Stopped worker");
        Ok(())
    }

    /// Drain: run jobs until none is claimable or a stop is requested.
    /// Returns how many jobs were processed.
    pub async fn process_jobs_once(&mut self) -> Result<usize, SpindleError> {
        let mut processed = 0;
        loop {
            match self.process_next_job().await? {
                Step::Processed { .. } | Step::ClaimLost { .. } => processed += 1,
                Step::NoJobAvailable | Step::StopRequested => return Ok(processed),
            }
        }
    }

    pub async fn process_next_job(&mut self) -> Result<Step, SpindleError> {
        if self.stop_requested() {
            return Ok(Step::StopRequested);
        }

        let Some(job) = self.store.claim(&self.config.queues).await? else {
            return Ok(Step::NoJobAvailable);
        };
        let job_id = job.id.ok_or(StoreError::NotPersisted)?;

        match self.run_job(job_id, job).await? {
            Some(status) => Ok(Step::Processed { job_id, status }),
            None => Ok(Step::ClaimLost { job_id }),
        }
    }

    /// Execute a claimed job and finalize it. `finish` is called exactly once,
    /// whatever the handler did. `None` when the claim went stale meanwhile.
    async fn run_job(&mut self, job_id: JobId, job: Job) -> Result<Option<JobStatus>, SpindleError> {
        let mut ctx = JobContext::new(&job);
        debug!(
            action = "loaded_job_info",
            worker = %self.config.name,
            job = %ctx,
            "Loaded job info, about to start job {}",
            ctx.call_string()
        );

        let outcome = match self.resolver.resolve(&job.task_name) {
            Err(err) => {
                error!(
                    action = "task_not_found",
                    worker = %self.config.name,
                    job_id = %job_id,
                    task_name = %job.task_name,
                    "{err}"
                );
                Outcome::failure(err.to_string())
            }
            Ok(task) => self.execute(job_id, &job, &task, &mut ctx).await,
        };

        let (status, scheduled_at) = outcome.finish_args();
        let finished = self.store.finish(&job, status, scheduled_at).await;
        self.set_current(None);
        if let Err(err @ StoreError::ClaimLost { .. }) = finished {
            warn!(
                action = "finish_task",
                worker = %self.config.name,
                job_id = %job_id,
                status = %status,
                "Discarding result of job {}: {err}",
                ctx.call_string()
            );
            return Ok(None);
        }
        finished?;

        debug!(
            action = "finish_task",
            worker = %self.config.name,
            job_id = %job_id,
            status = %status,
            "Finished job {}",
            ctx.call_string()
        );
        Ok(Some(status))
    }

    async fn execute(
        &self,
        job_id: JobId,
        job: &Job,
        task: &RegisteredTask,
        ctx: &mut JobContext,
    ) -> Outcome {
        ctx.start(self.clock.now());
        self.set_current(Some(ctx.clone()));
        info!(
            action = "start_job",
            worker = %self.config.name,
            job_id = %job_id,
            task_name = %job.task_name,
            "Starting job {}",
            ctx.call_string()
        );

        let result = call_handler(task.handler(), job.args.clone()).await;

        let now = self.clock.now();
        ctx.finish(now);
        let duration = ctx.duration_seconds.unwrap_or_default();

        match result {
            Ok(value) => {
                info!(
                    action = "job_success",
                    worker = %self.config.name,
                    job_id = %job_id,
                    task_name = %job.task_name,
                    duration,
                    result = %value,
                    "Job {} succeeded in {duration:.3}s",
                    ctx.call_string()
                );
                Outcome::success(value)
            }
            Err(err) => match task.retry().next_attempt(&err, job, now) {
                Some(at) => {
                    warn!(
                        action = "job_retry",
                        worker = %self.config.name,
                        job_id = %job_id,
                        task_name = %job.task_name,
                        duration,
                        retry_at = %at,
                        "Job {} failed after {duration:.3}s, retrying at {at}: {err}",
                        ctx.call_string()
                    );
                    Outcome::retry(err.to_string(), at)
                }
                None => {
                    error!(
                        action = "job_error",
                        worker = %self.config.name,
                        job_id = %job_id,
                        task_name = %job.task_name,
                        duration,
                        "Job {} failed after {duration:.3}s: {err}",
                        ctx.call_string()
                    );
                    Outcome::failure(err.to_string())
                }
            },
        }
    }

    /// Release this worker's store session.
    pub async fn close(&self) -> Result<(), SpindleError> {
        self.store.close().await?;
        Ok(())
    }
}

async fn call_handler(
    handler: Arc<dyn DynHandler>,
    args: JobArgs,
) -> Result<serde_json::Value, TaskError> {
    match tokio::spawn(async move { handler.call(args).await }).await {
        Ok(result) => result,
        Err(err) => Err(TaskError::Panicked(panic_message(err))),
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueFilter;
    use crate::impls::InMemoryJobStore;
    use crate::ports::FixedClock;
    use crate::typed::handler::fixtures::{AddHandler, ResizeHandler};
    use crate::typed::retry::FixedDelay;
    use crate::typed::task::fixtures::{Add, Resize};
    use crate::typed::{Task, handler_fn, handler_sync};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry.register::<Add, _>(AddHandler).unwrap();
        registry
    }

    /// Producer-side store plus a worker on its own session.
    fn setup(registry: TaskRegistry, config: WorkerConfig) -> (InMemoryJobStore, Worker) {
        let store = InMemoryJobStore::new();
        let session: Arc<dyn JobStore> = Arc::new(store.session());
        let worker = Worker::new(session, Arc::new(registry), config);
        (store, worker)
    }

    fn add_job(a: i64, b: i64) -> Job {
        Job::new("add").with_arg("a", a).with_arg("b", b)
    }

    #[tokio::test]
    async fn add_job_succeeds_and_keeps_its_id() {
        let (store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        let id = store.enqueue(add_job(1, 2)).await.unwrap();

        let step = worker.process_next_job().await.unwrap();
        assert_eq!(
            step,
            Step::Processed {
                job_id: id,
                status: JobStatus::Succeeded
            }
        );

        let job = store.get(id).await.unwrap();
        assert_eq!(job.id, Some(id));
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn empty_store_means_no_job_available() {
        let (_store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        assert_eq!(worker.process_next_job().await.unwrap(), Step::NoJobAvailable);
        assert_eq!(worker.process_jobs_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drain_processes_everything_claimable() {
        let (store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        for i in 0..3 {
            store.enqueue(add_job(i, i)).await.unwrap();
        }
        assert_eq!(worker.process_jobs_once().await.unwrap(), 3);
        assert_eq!(store.finished_jobs().await.len(), 3);
    }

    #[tokio::test]
    async fn stop_before_claim_leaves_jobs_alone() {
        let (store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        let id = store.enqueue(add_job(1, 2)).await.unwrap();

        worker.stop_handle().stop();
        assert_eq!(worker.process_next_job().await.unwrap(), Step::StopRequested);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Todo);
    }

    #[tokio::test]
    async fn stop_during_execution_finishes_current_job_only() {
        let handle: Arc<OnceLock<StopHandle>> = Arc::new(OnceLock::new());
        let from_task = Arc::clone(&handle);

        let mut registry = TaskRegistry::new();
        registry
            .register_task(RegisteredTask::new(
                "stopper",
                handler_fn(move |_args| {
                    let handle = Arc::clone(&from_task);
                    async move {
                        if let Some(handle) = handle.get() {
                            handle.stop();
                        }
                        tokio::task::yield_now().await;
                        Ok(json!("done"))
                    }
                }),
            ))
            .unwrap();

        let (store, mut worker) = setup(registry, WorkerConfig::new("w"));
        handle.set(worker.stop_handle()).unwrap();
        let first = store.enqueue(Job::new("stopper")).await.unwrap();
        let second = store.enqueue(Job::new("stopper")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), worker.run())
            .await
            .expect("worker should stop")
            .unwrap();

        assert_eq!(store.get(first).await.unwrap().status, JobStatus::Succeeded);
        assert_eq!(store.get(second).await.unwrap().status, JobStatus::Todo);
        assert!(store.current_locks().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_task_fails_and_is_remembered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = move |_: &str| -> Option<RegisteredTask> {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        };

        let (store, worker) = setup(registry(), WorkerConfig::new("w"));
        let mut worker = worker.with_loader(Arc::new(loader));
        let first = store.enqueue(Job::new("nope")).await.unwrap();
        let second = store.enqueue(Job::new("nope")).await.unwrap();

        assert_eq!(worker.process_jobs_once().await.unwrap(), 2);

        assert_eq!(store.get(first).await.unwrap().status, JobStatus::Failed);
        assert_eq!(store.get(second).await.unwrap().status, JobStatus::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dynamically_loaded_task_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = move |name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            (name == Resize::NAME).then(|| RegisteredTask::typed::<Resize, _>(ResizeHandler))
        };

        let (store, worker) = setup(TaskRegistry::new(), WorkerConfig::new("w"));
        let mut worker = worker.with_loader(Arc::new(loader));
        for width in [100, 200] {
            let job = Job::new(Resize::NAME)
                .with_queue("images")
                .with_arg("path", "a.png")
                .with_arg("width", width);
            store.enqueue(job).await.unwrap();
        }

        assert_eq!(worker.process_jobs_once().await.unwrap(), 2);
        let counts = store.counts_by_status().await;
        assert_eq!(counts.get(&JobStatus::Succeeded), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flaky_task_is_retried_later() {
        let clock = Arc::new(FixedClock::new(start()));
        let store = InMemoryJobStore::with_clock(clock.clone());

        let mut registry = TaskRegistry::new();
        registry
            .register_task(
                RegisteredTask::new("flaky", handler_sync(|_| Err(TaskError::failed("flaky"))))
                    .with_retry(FixedDelay::new(Duration::from_secs(60))),
            )
            .unwrap();
        let mut worker = Worker::new(
            Arc::new(store.session()),
            Arc::new(registry),
            WorkerConfig::new("w"),
        )
        .with_clock(clock.clone());

        let id = store.enqueue(Job::new("flaky")).await.unwrap();
        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Step::Processed {
                job_id: id,
                status: JobStatus::Todo
            }
        );

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Todo);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.scheduled_at, Some(start() + chrono::Duration::seconds(60)));

        // not claimable before the retry time
        assert_eq!(worker.process_next_job().await.unwrap(), Step::NoJobAvailable);

        clock.advance(chrono::Duration::seconds(60));
        assert!(matches!(
            worker.process_next_job().await.unwrap(),
            Step::Processed { .. }
        ));
        assert_eq!(store.get(id).await.unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn failure_without_retry_is_terminal() {
        let mut registry = TaskRegistry::new();
        registry
            .register_task(RegisteredTask::new(
                "broken",
                handler_sync(|_| Err(TaskError::failed("nope"))),
            ))
            .unwrap();
        let (store, mut worker) = setup(registry, WorkerConfig::new("w"));
        let id = store.enqueue(Job::new("broken")).await.unwrap();

        worker.process_jobs_once().await.unwrap();
        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn bad_arguments_fail_the_job() {
        let (store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        let id = store.enqueue(Job::new("add").with_arg("a", "one")).await.unwrap();

        worker.process_jobs_once().await.unwrap();
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn panicking_handler_fails_the_job() {
        let mut registry = registry();
        registry
            .register_task(RegisteredTask::new(
                "panics",
                handler_sync(|_| panic!("kaboom")),
            ))
            .unwrap();
        let (store, mut worker) = setup(registry, WorkerConfig::new("w"));
        let id = store.enqueue(Job::new("panics")).await.unwrap();
        let next = store.enqueue(add_job(2, 2)).await.unwrap();

        assert_eq!(worker.process_jobs_once().await.unwrap(), 2);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Failed);
        assert_eq!(store.get(next).await.unwrap().status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn panic_message_reaches_retry_policy() {
        let seen = Arc::new(std::sync::Mutex::new(None::<String>));
        let record = Arc::clone(&seen);
        let policy = move |err: &TaskError, _: &Job, _: DateTime<Utc>| -> Option<DateTime<Utc>> {
            *record.lock().unwrap() = Some(err.to_string());
            None
        };

        let mut registry = TaskRegistry::new();
        registry
            .register_task(
                RegisteredTask::new("panics", handler_sync(|_| panic!("kaboom"))).with_retry(policy),
            )
            .unwrap();
        let (store, mut worker) = setup(registry, WorkerConfig::new("w"));
        store.enqueue(Job::new("panics")).await.unwrap();

        worker.process_jobs_once().await.unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("task panicked: kaboom"));
    }

    #[tokio::test]
    async fn queue_filter_limits_claims() {
        let config = WorkerConfig::new("w").with_queues(["images"]);
        let mut registry = registry();
        registry.register::<Resize, _>(ResizeHandler).unwrap();
        let (store, mut worker) = setup(registry, config);

        let other = store.enqueue(add_job(1, 1)).await.unwrap();
        let mine = store
            .enqueue(
                Job::new(Resize::NAME)
                    .with_queue("images")
                    .with_arg("path", "b.png")
                    .with_arg("width", 10),
            )
            .await
            .unwrap();

        assert_eq!(worker.process_jobs_once().await.unwrap(), 1);
        assert_eq!(store.get(mine).await.unwrap().status, JobStatus::Succeeded);
        assert_eq!(store.get(other).await.unwrap().status, JobStatus::Todo);
    }

    #[tokio::test]
    async fn idle_worker_wakes_on_enqueue() {
        let config = WorkerConfig::new("w").with_wait_timeout(Duration::from_secs(60));
        let (store, mut worker) = setup(registry(), config);
        let stop = worker.stop_handle();
        let running = tokio::spawn(async move { worker.run().await });

        // let the worker subscribe and go idle
        tokio::task::yield_now().await;
        let id = store.enqueue(add_job(20, 22)).await.unwrap();

        let done = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if store.get(id).await.map(|j| j.status) == Some(JobStatus::Succeeded) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(done.is_ok(), "job was not picked up");

        stop.stop();
        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("worker should stop promptly")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn result_of_a_requeued_job_is_discarded() {
        let clock = Arc::new(FixedClock::new(start()));
        let store = InMemoryJobStore::with_clock(clock.clone());
        let second_claim: Arc<OnceLock<Job>> = Arc::new(OnceLock::new());

        // while the handler runs, the job is reaped and claimed by someone else
        let producer = Arc::new(store.session());
        let (tick, claimed) = (clock.clone(), Arc::clone(&second_claim));
        let mut registry = TaskRegistry::new();
        registry
            .register_task(RegisteredTask::new(
                "slow",
                handler_fn(move |_args| {
                    let (store, clock, claimed) =
                        (Arc::clone(&producer), Arc::clone(&tick), Arc::clone(&claimed));
                    async move {
                        clock.advance(chrono::Duration::minutes(40));
                        let stalled = store
                            .list_stalled(Duration::from_secs(30 * 60), None, None)
                            .await
                            .unwrap();
                        for job in &stalled {
                            store.finish(job, JobStatus::Todo, None).await.unwrap();
                        }
                        if let Some(job) = store.claim(&QueueFilter::Any).await.unwrap() {
                            let _ = claimed.set(job);
                        }
                        Ok(json!("late"))
                    }
                }),
            ))
            .unwrap();

        let mut worker = Worker::new(
            Arc::new(store.session()),
            Arc::new(registry),
            WorkerConfig::new("w"),
        )
        .with_clock(clock.clone());
        let id = store.enqueue(Job::new("slow")).await.unwrap();

        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Step::ClaimLost { job_id: id }
        );

        // the new owner is untouched and can still finish its claim
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Doing);
        let owner = second_claim.get().expect("job should be claimed again");
        store.finish(owner, JobStatus::Succeeded, None).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn closed_store_error_is_returned_from_run() {
        let (_store, mut worker) = setup(registry(), WorkerConfig::new("w"));
        worker.close().await.unwrap();

        let err = worker.run().await.unwrap_err();
        assert!(matches!(err, SpindleError::Store(StoreError::Closed)));
    }

    #[tokio::test]
    async fn filter_any_is_default() {
        let (_store, worker) = setup(registry(), WorkerConfig::default());
        assert_eq!(worker.config().queues, QueueFilter::Any);
        assert!(!worker.stop_handle().is_stop_requested());
    }
}
