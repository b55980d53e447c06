//! TaskRegistry - Handler の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権
//!
//! The registry only holds what the host declared at startup. Tasks that are
//! not declared may still be found through a [`TaskLoader`]; see
//! [`TaskResolver`](super::resolver::TaskResolver).

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::retry::{NoRetry, RetryPolicy};
use super::task::Task;
use crate::domain::DEFAULT_QUEUE;

/// A handler together with its per-task configuration.
#[derive(Clone)]
pub struct RegisteredTask {
    name: String,
    handler: Arc<dyn DynHandler>,
    retry: Arc<dyn RetryPolicy>,
    queue: String,
}

impl RegisteredTask {
    /// Untyped task over raw keyword arguments.
    pub fn new(name: impl Into<String>, handler: impl DynHandler + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            retry: Arc::new(NoRetry),
            queue: DEFAULT_QUEUE.to_string(),
        }
    }

    /// 型付き Task: name と queue は `T` から取る
    pub fn typed<T: Task, H: Handler<T> + 'static>(handler: H) -> Self {
        Self {
            name: T::NAME.to_string(),
            handler: Arc::new(TypedHandler::<T, H>::new(handler)),
            retry: Arc::new(NoRetry),
            queue: T::QUEUE.to_string(),
        }
    }

    pub fn with_retry(mut self, retry: impl RetryPolicy + 'static) -> Self {
        self.retry = Arc::new(retry);
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> Arc<dyn DynHandler> {
        Arc::clone(&self.handler)
    }

    pub fn retry(&self) -> Arc<dyn RetryPolicy> {
        Arc::clone(&self.retry)
    }

    /// Queue used by `App::defer_task`.
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl std::fmt::Debug for RegisteredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTask")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// RegistryError は TaskRegistry / TaskResolver の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for task '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Cannot run job for task '{0}' previously not found")]
    PreviouslyMissing(String),
}

impl RegistryError {
    pub fn task_name(&self) -> &str {
        match self {
            RegistryError::AlreadyRegistered(name)
            | RegistryError::TaskNotFound(name)
            | RegistryError::PreviouslyMissing(name) => name,
        }
    }
}

/// Fallback lookup for task names that were not registered up front.
pub trait TaskLoader: Send + Sync {
    fn load(&self, task_name: &str) -> Option<RegisteredTask>;
}

impl<F> TaskLoader for F
where
    F: Fn(&str) -> Option<RegisteredTask> + Send + Sync,
{
    fn load(&self, task_name: &str) -> Option<RegisteredTask> {
        self(task_name)
    }
}

/// Loader that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl TaskLoader for NoLoader {
    fn load(&self, _: &str) -> Option<RegisteredTask> {
        None
    }
}

/// TaskRegistry は task name → RegisteredTask の対応を保持
///
/// # 使用例
/// ```ignore
/// let mut registry = TaskRegistry::new();
/// registry.register::<Add, _>(AddHandler)?;
///
/// let task = registry.get("add");
/// ```
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_task(RegisteredTask::typed::<T, H>(handler))
    }

    pub fn register_task(&mut self, task: RegisteredTask) -> Result<(), RegistryError> {
        if self.tasks.contains_key(task.name()) {
            return Err(RegistryError::AlreadyRegistered(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, task_name: &str) -> Option<&RegisteredTask> {
        self.tasks.get(task_name)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.tasks.contains_key(task_name)
    }

    /// Sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::handler::fixtures::{AddHandler, ResizeHandler};
    use crate::typed::handler::handler_sync;
    use crate::typed::retry::FixedDelay;
    use crate::typed::task::fixtures::{Add, Resize};
    use std::time::Duration;

    #[test]
    fn test_register_and_get() {
        let mut registry = TaskRegistry::new();
        registry.register::<Add, _>(AddHandler).unwrap();

        let task = registry.get(Add::NAME).unwrap();
        assert_eq!(task.name(), "add");
        assert_eq!(task.queue(), DEFAULT_QUEUE);
    }

    #[test]
    fn test_double_registration() {
        let mut registry = TaskRegistry::new();
        registry.register::<Add, _>(AddHandler).unwrap();
        let result = registry.register::<Add, _>(AddHandler);
        assert_eq!(result, Err(RegistryError::AlreadyRegistered("add".into())));
    }

    #[test]
    fn test_registered_names_are_sorted() {
        let mut registry = TaskRegistry::new();
        registry.register::<Resize, _>(ResizeHandler).unwrap();
        registry.register::<Add, _>(AddHandler).unwrap();
        assert_eq!(registry.registered_names(), vec!["add", "images.resize"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn typed_task_carries_its_queue() {
        let task = RegisteredTask::typed::<Resize, _>(ResizeHandler);
        assert_eq!(task.queue(), "images");
        assert_eq!(task.with_queue("bulk").queue(), "bulk");
    }

    #[test]
    fn untyped_task_with_retry() {
        let mut registry = TaskRegistry::new();
        let task = RegisteredTask::new("flaky", handler_sync(|_| Ok(serde_json::Value::Null)))
            .with_retry(FixedDelay::new(Duration::from_secs(60)));
        registry.register_task(task).unwrap();
        assert!(registry.contains("flaky"));
        assert!(!registry.contains("add"));
    }

    #[test]
    fn closure_loader() {
        let loader = |name: &str| {
            (name == "add").then(|| RegisteredTask::typed::<Add, _>(AddHandler))
        };
        assert!(loader.load("add").is_some());
        assert!(loader.load("nope").is_none());
        assert!(NoLoader.load("add").is_none());
    }
}
