//! Worker configuration.

use std::time::Duration;

use thiserror::Error;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerConfigError {
    #[error("queue name is required")]
    QueueNameRequired,

    #[error("max attempts must be greater than 0")]
    MaxAttemptsInvalid,
}

/// Validated runtime configuration of a single worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Logical queue this worker drains.
    pub queue: String,
    /// Failed executions before a job is dead-lettered.
    pub max_attempts: u32,
    /// Scalar of the exponential backoff schedule.
    pub base_backoff_ms: u64,
    /// Pause between queue polls.
    pub poll_interval: Duration,
}

impl WorkerConfig {
    pub fn new(
        queue: impl Into<String>,
        max_attempts: u32,
        base_backoff_ms: u64,
    ) -> Result<Self, WorkerConfigError> {
        let queue = queue.into();
        if queue.is_empty() {
            return Err(WorkerConfigError::QueueNameRequired);
        }
        if max_attempts == 0 {
            return Err(WorkerConfigError::MaxAttemptsInvalid);
        }

        Ok(Self {
            queue,
            max_attempts,
            base_backoff_ms,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
