//! Demo tasks.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spindle_core::domain::{JobArgs, TaskError};
use spindle_core::typed::{
    ExponentialBackoff, Handler, RegisteredTask, RegistryError, Task, handler_fn, handler_sync,
};
use spindle_core::AppBuilder;

/// `sum(a, b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sum {
    pub a: i64,
    pub b: i64,
}

impl Task for Sum {
    const NAME: &'static str = "sum";
}

pub struct SumHandler;

#[async_trait]
impl Handler<Sum> for SumHandler {
    async fn handle(&self, task: Sum) -> Result<serde_json::Value, TaskError> {
        Ok(serde_json::json!(task.a + task.b))
    }
}

/// Sleeps on the `slow` queue, one job per `key` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sleep {
    pub key: String,
    pub millis: u64,
}

impl Task for Sleep {
    const NAME: &'static str = "sleep";
    const QUEUE: &'static str = "slow";

    fn lock(&self) -> Option<String> {
        Some(self.key.clone())
    }
}

pub struct SleepHandler;

#[async_trait]
impl Handler<Sleep> for SleepHandler {
    async fn handle(&self, task: Sleep) -> Result<serde_json::Value, TaskError> {
        tokio::time::sleep(Duration::from_millis(task.millis)).await;
        Ok(serde_json::json!({ "slept_ms": task.millis }))
    }
}

fn int_arg(args: &JobArgs, name: &str) -> Result<i64, TaskError> {
    args.get(name)
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| TaskError::failed(format!("missing integer argument {name:?}")))
}

pub fn register(builder: AppBuilder) -> Result<AppBuilder, RegistryError> {
    builder
        .register::<Sum, _>(SumHandler)?
        .register::<Sleep, _>(SleepHandler)?
        .register_task(RegisteredTask::new(
            "sum_plus_one",
            handler_sync(|args| Ok(serde_json::json!(int_arg(&args, "a")? + int_arg(&args, "b")? + 1))),
        ))?
        .register_task(
            RegisteredTask::new(
                "random_fail",
                handler_fn(|_args| async move {
                    if rand::random::<f64>() < 0.5 {
                        return Err(TaskError::failed("unlucky"));
                    }
                    Ok(serde_json::Value::Null)
                }),
            )
            .with_retry(ExponentialBackoff {
                base_delay: Duration::from_millis(100),
                multiplier: 2.0,
                max_attempts: Some(4),
            }),
        )
}
