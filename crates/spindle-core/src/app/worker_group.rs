use std::sync::Arc;

use tokio::task::JoinHandle;

use super::worker_loop::{StopHandle, Worker};
use crate::error::SpindleError;

/// Worker group handle.
/// - `request_shutdown()` で全ワーカーに stop を要求（実行中の job は最後まで走る）
/// - `join()` で全ワーカーの終了を待てる
///
/// Each worker runs on its own tokio task with its own store session, which
/// is closed when the worker returns.
pub struct WorkerGroup {
    stops: Vec<StopHandle>,
    joins: Vec<JoinHandle<Result<(), SpindleError>>>,
}

impl WorkerGroup {
    /// Spawn one task per worker.
    pub fn spawn(workers: Vec<Worker>) -> Self {
        let mut stops = Vec::with_capacity(workers.len());
        let mut joins = Vec::with_capacity(workers.len());

        for mut worker in workers {
            stops.push(worker.stop_handle());
            let join = tokio::spawn(async move {
                let result = worker.run().await;
                let closed = worker.close().await;
                result.and(closed)
            });
            joins.push(join);
        }

        Self { stops, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn stop_handles(&self) -> &[StopHandle] {
        &self.stops
    }

    /// A handle stopping every worker of the group.
    pub fn shutdown_handle(&self) -> GroupStopHandle {
        GroupStopHandle {
            stops: Arc::from(self.stops.clone()),
        }
    }

    /// Request shutdown for all workers. Does not wait.
    pub fn request_shutdown(&self) {
        for stop in &self.stops {
            stop.stop();
        }
    }

    /// Wait for every worker. Returns the first error, after all of them ended.
    pub async fn join(self) -> Result<(), SpindleError> {
        let mut first_error = None;
        for join in self.joins {
            let result = match join.await {
                Ok(result) => result,
                Err(err) => Err(SpindleError::WorkerPanicked(err.to_string())),
            };
            if let Err(err) = result
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) -> Result<(), SpindleError> {
        self.request_shutdown();
        self.join().await
    }
}

/// Clonable stop for a whole group, for signal handlers.
#[derive(Clone, Debug)]
pub struct GroupStopHandle {
    stops: Arc<[StopHandle]>,
}

impl GroupStopHandle {
    pub fn stop(&self) {
        for stop in self.stops.iter() {
            stop.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::domain::{Job, JobStatus};
    use crate::impls::InMemoryJobStore;
    use crate::ports::JobStore;
    use crate::typed::{RegisteredTask, TaskRegistry, handler_fn};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lock_is_never_held_twice_across_workers() {
        let store = InMemoryJobStore::new();

        // (lock, running) pairs; a lock must never be entered while running
        let running: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let violations = Arc::new(Mutex::new(0usize));

        let mut registry = TaskRegistry::new();
        let (r, v) = (Arc::clone(&running), Arc::clone(&violations));
        registry
            .register_task(RegisteredTask::new(
                "locked",
                handler_fn(move |args| {
                    let (running, violations) = (Arc::clone(&r), Arc::clone(&v));
                    async move {
                        let lock = args["key"].as_str().unwrap_or_default().to_string();
                        if !running.lock().unwrap().insert(lock.clone()) {
                            *violations.lock().unwrap() += 1;
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        running.lock().unwrap().remove(&lock);
                        Ok(json!(null))
                    }
                }),
            ))
            .unwrap();
        let registry = Arc::new(registry);

        for i in 0..40 {
            let key = if i % 2 == 0 { "X" } else { "Y" };
            store
                .enqueue(Job::new("locked").with_lock(key).with_arg("key", key))
                .await
                .unwrap();
        }

        let workers = (0..4)
            .map(|i| {
                Worker::new(
                    Arc::new(store.session()),
                    Arc::clone(&registry),
                    WorkerConfig::new(format!("w{i}")).with_wait_timeout(Duration::from_millis(20)),
                )
            })
            .collect();
        let group = WorkerGroup::spawn(workers);
        assert_eq!(group.len(), 4);

        tokio::time::timeout(Duration::from_secs(10), async {
            while store.finished_jobs().await.len() < 40 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("all jobs should finish");

        group.shutdown_and_join().await.unwrap();
        assert_eq!(*violations.lock().unwrap(), 0);
        let counts = store.counts_by_status().await;
        assert_eq!(counts.get(&JobStatus::Succeeded), Some(&40));
    }

    #[tokio::test]
    async fn group_stop_handle_stops_everyone() {
        let store = InMemoryJobStore::new();
        let registry = Arc::new(TaskRegistry::new());
        let workers = (0..2)
            .map(|i| {
                Worker::new(
                    Arc::new(store.session()),
                    Arc::clone(&registry),
                    WorkerConfig::new(format!("w{i}")).with_wait_timeout(Duration::from_secs(60)),
                )
            })
            .collect();
        let group = WorkerGroup::spawn(workers);
        let handle = group.shutdown_handle();

        tokio::task::yield_now().await;
        handle.stop();
        assert!(group.stop_handles().iter().all(StopHandle::is_stop_requested));

        tokio::time::timeout(Duration::from_secs(5), group.join())
            .await
            .expect("workers should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn empty_group_joins_immediately() {
        let group = WorkerGroup::spawn(Vec::new());
        assert!(group.is_empty());
        group.shutdown_and_join().await.unwrap();
    }
}
