//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use tracing::info;

use super::worker_group::WorkerGroup;
use super::worker_loop::Worker;
use crate::config::WorkerConfig;
use crate::domain::{Job, JobId, StoreError};
use crate::error::SpindleError;
use crate::observability::JobContext;
use crate::ports::{Clock, JobStore, SystemClock};
use crate::typed::{
    ArgsCodec, Handler, NoLoader, RegisteredTask, RegistryError, Task, TaskLoader, TaskRegistry,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register::<Add, _>(AddHandler)?
///     .expect_tasks(&["add"])
///     .store(Arc::new(InMemoryJobStore::new()))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task name を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
pub struct AppBuilder {
    registry: TaskRegistry,
    expected_tasks: Option<Vec<String>>,
    store: Option<Arc<dyn JobStore>>,
    loader: Arc<dyn TaskLoader>,
    clock: Arc<dyn Clock>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing tasks: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("No job store configured")]
    MissingStore,
}

impl AppBuilder {
    /// 新しい AppBuilder を作成
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            expected_tasks: None,
            store: None,
            loader: Arc::new(NoLoader),
            clock: Arc::new(SystemClock),
        }
    }

    /// 型付き Handler を登録
    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    /// 設定済みの task（untyped, retry policy 付きなど）を登録
    pub fn register_task(mut self, task: RegisteredTask) -> Result<Self, RegistryError> {
        self.registry.register_task(task)?;
        Ok(self)
    }

    /// 期待される task name のリストを設定
    pub fn expect_tasks(mut self, task_names: &[&str]) -> Self {
        self.expected_tasks = Some(task_names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fallback for task names missing from the registry.
    pub fn loader(mut self, loader: Arc<dyn TaskLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Clock handed to workers. Use the store's clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - expect_tasks() で設定された task name が全て登録されているかチェック
    /// - store が設定されているかチェック
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|name| !self.registry.contains(name))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }
        let store = self.store.ok_or(BuildError::MissingStore)?;

        Ok(App {
            registry: Arc::new(self.registry),
            store,
            loader: self.loader,
            clock: self.clock,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は登録済み task と store をまとめたもの
///
/// Producers defer jobs through it; workers are created from it, each on its
/// own store session.
pub struct App {
    registry: Arc<TaskRegistry>,
    store: Arc<dyn JobStore>,
    loader: Arc<dyn TaskLoader>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Enqueue a job by name.
    pub async fn defer(&self, job: Job) -> Result<JobId, StoreError> {
        let call = JobContext::new(&job).call_string();
        let job_id = self.store.enqueue(job).await?;
        info!(
            action = "job_defer",
            job_id = %job_id,
            "Deferred job {call} as {job_id}"
        );
        Ok(job_id)
    }

    /// Enqueue a typed task. The queue is the registered task's (defaults to
    /// `T::QUEUE`) and the lock is `task.lock()`.
    pub async fn defer_task<T: Task>(&self, task: &T) -> Result<JobId, SpindleError> {
        let args = ArgsCodec::encode(task)?;
        let queue = self
            .registry
            .get(T::NAME)
            .map_or(T::QUEUE, RegisteredTask::queue);

        let mut job = Job::new(T::NAME).with_args(args).with_queue(queue);
        if let Some(lock) = task.lock() {
            job = job.with_lock(lock);
        }
        Ok(self.defer(job).await?)
    }

    /// A worker on a fresh store session.
    pub async fn worker(&self, config: WorkerConfig) -> Result<Worker, SpindleError> {
        config.validate()?;
        let session = self.store.connect().await?;
        Ok(Worker::new(session, Arc::clone(&self.registry), config)
            .with_loader(Arc::clone(&self.loader))
            .with_clock(Arc::clone(&self.clock)))
    }

    /// Spawn `count` workers named `<config.name>-<n>`.
    pub async fn spawn_workers(
        &self,
        count: usize,
        config: WorkerConfig,
    ) -> Result<WorkerGroup, SpindleError> {
        let mut workers = Vec::with_capacity(count);
        for n in 0..count {
            let config = WorkerConfig {
                name: format!("{}-{n}", config.name),
                ..config.clone()
            };
            workers.push(self.worker(config).await?);
        }
        Ok(WorkerGroup::spawn(workers))
    }
}
