//! Executor plug-point: the capability that performs a job's domain work.

use async_trait::async_trait;

use conveyor_queue::Job;

/// Outcome of one execution attempt.
///
/// A domain failure is reported as `success = false` with a non-empty error
/// message; the worker treats it exactly like an infrastructure error from
/// the executor and routes both through the retry pipeline.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub error: Option<String>,
    pub output: Option<serde_json::Value>,
}

impl ExecutionResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            output: None,
        }
    }

    pub fn success_with(output: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            output: Some(output),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            output: None,
        }
    }
}

/// Pluggable job executor.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Whether this executor knows the given job type.
    fn can_handle(&self, job_type: &str) -> bool;

    /// Execute one attempt. Cancellation is delivered by dropping the future;
    /// implementations must not panic across this boundary.
    async fn execute(&self, job: &Job) -> ExecutionResult;
}
