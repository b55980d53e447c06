//! Handler trait - Task を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)
//!
//! A handler may finish immediately or suspend on I/O; the worker awaits it
//! either way. Plain closures are accepted through [`handler_fn`] (async) and
//! [`handler_sync`] (blocking-free, immediate).

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::codec::ArgsCodec;
use super::task::Task;
use crate::domain::{JobArgs, TaskError};

/// Handler は Task を実行して結果を返す
///
/// The returned value is only logged.
///
/// # 使用例
/// ```ignore
/// struct AddHandler;
///
/// #[async_trait]
/// impl Handler<Add> for AddHandler {
///     async fn handle(&self, task: Add) -> Result<serde_json::Value, TaskError> {
///         Ok(serde_json::json!(task.a + task.b))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<serde_json::Value, TaskError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// HashMap<String, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn call(&self, args: JobArgs) -> Result<serde_json::Value, TaskError>;
}

/// Decodes the job's args into `T`, then runs the typed handler.
pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn call(&self, args: JobArgs) -> Result<serde_json::Value, TaskError> {
        let task: T = ArgsCodec::decode(args)?;
        self.handler.handle(task).await
    }
}

/// Async closure over raw keyword arguments.
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(JobArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, TaskError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> DynHandler for FnHandler<F>
where
    F: Fn(JobArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, TaskError>> + Send + 'static,
{
    async fn call(&self, args: JobArgs) -> Result<serde_json::Value, TaskError> {
        (self.0)(args).await
    }
}

/// Closure that completes without suspending.
pub struct SyncFnHandler<F>(F);

pub fn handler_sync<F>(f: F) -> SyncFnHandler<F>
where
    F: Fn(JobArgs) -> Result<serde_json::Value, TaskError> + Send + Sync + 'static,
{
    SyncFnHandler(f)
}

#[async_trait]
impl<F> DynHandler for SyncFnHandler<F>
where
    F: Fn(JobArgs) -> Result<serde_json::Value, TaskError> + Send + Sync + 'static,
{
    async fn call(&self, args: JobArgs) -> Result<serde_json::Value, TaskError> {
        (self.0)(args)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::AddHandler;
    use super::*;
    use crate::typed::task::fixtures::Add;
    use serde_json::json;

    fn args(value: serde_json::Value) -> JobArgs {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_args() {
        let handler = TypedHandler::<Add, _>::new(AddHandler);
        let result = handler.call(args(json!({ "a": 9, "b": 3 }))).await.unwrap();
        assert_eq!(result, json!(12));
    }

    #[tokio::test]
    async fn typed_handler_reports_bad_args() {
        let handler = TypedHandler::<Add, _>::new(AddHandler);
        let err = handler.call(args(json!({ "a": "x" }))).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn async_closure_handler() {
        let handler = handler_fn(|args: JobArgs| async move {
            tokio::task::yield_now().await;
            Ok(json!(args.len()))
        });
        let result = handler.call(args(json!({ "x": 1 }))).await.unwrap();
        assert_eq!(result, json!(1));
    }

    #[tokio::test]
    async fn sync_closure_handler() {
        let handler = handler_sync(|_args| Err(TaskError::failed("nope")));
        let err = handler.call(JobArgs::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
