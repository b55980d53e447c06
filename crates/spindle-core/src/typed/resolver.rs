//! TaskResolver - task name から実行可能な RegisteredTask を引く
//!
//! Order: declared registry, memoized dynamic loads, then the loader.
//! A name the loader could not find goes into `known_missing` and is never
//! looked up again by this resolver.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use super::registry::{RegisteredTask, RegistryError, TaskLoader, TaskRegistry};

pub struct TaskResolver {
    declared: Arc<TaskRegistry>,
    loader: Arc<dyn TaskLoader>,
    loaded: HashMap<String, RegisteredTask>,
    known_missing: HashSet<String>,
}

impl TaskResolver {
    pub fn new(declared: Arc<TaskRegistry>, loader: Arc<dyn TaskLoader>) -> Self {
        Self {
            declared,
            loader,
            loaded: HashMap::new(),
            known_missing: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, task_name: &str) -> Result<RegisteredTask, RegistryError> {
        if let Some(task) = self.declared.get(task_name) {
            return Ok(task.clone());
        }
        if let Some(task) = self.loaded.get(task_name) {
            return Ok(task.clone());
        }
        if self.known_missing.contains(task_name) {
            return Err(RegistryError::PreviouslyMissing(task_name.to_string()));
        }

        match self.loader.load(task_name) {
            Some(task) => {
                warn!(
                    action = "load_dynamic_task",
                    task_name,
                    "Task at {task_name} was not registered, it's been loaded dynamically."
                );
                self.loaded.insert(task_name.to_string(), task.clone());
                Ok(task)
            }
            None => {
                self.known_missing.insert(task_name.to_string());
                Err(RegistryError::TaskNotFound(task_name.to_string()))
            }
        }
    }

    pub fn is_known_missing(&self, task_name: &str) -> bool {
        self.known_missing.contains(task_name)
    }

    pub fn declared(&self) -> &Arc<TaskRegistry> {
        &self.declared
    }
}
