//! Worker configuration
//!
//! Defaults, environment overrides and validation for one worker.

use std::time::Duration;

use crate::domain::QueueFilter;

pub const ENV_WORKER_NAME: &str = "SPINDLE_WORKER_NAME";
pub const ENV_QUEUES: &str = "SPINDLE_QUEUES";
pub const ENV_WAIT_TIMEOUT_SECS: &str = "SPINDLE_WAIT_TIMEOUT_SECS";

pub const DEFAULT_WORKER_NAME: &str = "worker";
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("worker name cannot be empty")]
    EmptyName,

    #[error("wait_timeout must be greater than 0")]
    ZeroWaitTimeout,
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Used in logs only.
    pub name: String,

    /// Queues this worker claims from. `Any` listens on the catch-all channel.
    pub queues: QueueFilter,

    /// Upper bound for one idle wait. A notification or a stop ends it early.
    pub wait_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKER_NAME.to_string(),
            queues: QueueFilter::Any,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = QueueFilter::named(queues);
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SPINDLE_WORKER_NAME (optional, default: "worker")
    /// - SPINDLE_QUEUES (optional, comma separated, default: all queues)
    /// - SPINDLE_WAIT_TIMEOUT_SECS (optional, seconds, default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_WORKER_NAME) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_QUEUES) {
            config.queues = QueueFilter::named(
                raw.split(',')
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string),
            );
        }

        if let Some(raw) = lookup(ENV_WAIT_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: ENV_WAIT_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.wait_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.wait_timeout.is_zero() {
            return Err(ConfigError::ZeroWaitTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.name, "worker");
        assert_eq!(config.queues, QueueFilter::Any);
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_everything() {
        let config = WorkerConfig::from_lookup(lookup(&[
            (ENV_WORKER_NAME, "billing-1"),
            (ENV_QUEUES, "emails, billing"),
            (ENV_WAIT_TIMEOUT_SECS, "30"),
        ]))
        .unwrap();

        assert_eq!(config.name, "billing-1");
        assert_eq!(config.queues, QueueFilter::named(["billing", "emails"]));
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_queue_list_means_all_queues() {
        let config = WorkerConfig::from_lookup(lookup(&[(ENV_QUEUES, " , ")])).unwrap();
        assert_eq!(config.queues, QueueFilter::Any);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = WorkerConfig::from_lookup(lookup(&[(ENV_WAIT_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn test_validation_empty_name() {
        let config = WorkerConfig::new("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = WorkerConfig::default().with_wait_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWaitTimeout));
    }
}
