//! Job entity and its lifecycle state machine.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conveyor_core::JobId;

use crate::error::QueueError;

/// Job processing status.
///
/// Transitions are driven exclusively through the [`Job`] mark methods:
///
/// ```text
/// pending ---> processing ---> completed
///    ^             |
///    |             v
/// retrying <--- failed (attempts < max)
///                  |
///                  v
///              failed, attempts >= max (dead-lettered)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up.
    Pending,
    /// Currently being executed by a worker.
    Processing,
    /// Completed successfully (terminal).
    Completed,
    /// Last execution failed; dead-lettered once attempts reach the budget.
    Failed,
    /// Scheduled for another attempt after backoff.
    Retrying,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Retrying,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Retrying => "retrying",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "retrying" => Ok(JobStatus::Retrying),
            other => Err(QueueError::InvalidStatus(other.to_string())),
        }
    }
}

/// A background job.
///
/// The metadata store is authoritative for every field here; the copy
/// travelling through the dispatch channel is an advisory snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Logical queue the job is dispatched on.
    pub queue: String,
    /// Job kind; routes the job to an executor.
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    /// Count of completed execution attempts (incremented on failure).
    pub attempts: u32,
    /// Opaque JSON payload; immutable through the engine.
    pub payload: serde_json::Value,
    /// Last failure message; empty until the first failure.
    #[serde(default)]
    pub error: String,
    /// If set and in the future, the job is not yet eligible to run.
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job, validating the submission invariants.
    pub fn new(
        queue: impl Into<String>,
        job_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Self, QueueError> {
        let queue = queue.into();
        let job_type = job_type.into();
        if queue.is_empty() {
            return Err(QueueError::InvalidQueue);
        }
        if job_type.is_empty() {
            return Err(QueueError::InvalidType);
        }

        let now = Utc::now();
        Ok(Self {
            id: JobId::new(),
            queue,
            job_type,
            status: JobStatus::Pending,
            attempts: 0,
            payload,
            error: String::new(),
            scheduled_for: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the job may be retried under the given attempt budget.
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.attempts < max_attempts && self.status == JobStatus::Failed
    }

    /// Whether the job is eligible to execute right now.
    pub fn is_ready(&self) -> bool {
        if self.status != JobStatus::Pending && self.status != JobStatus::Retrying {
            return false;
        }
        match self.scheduled_for {
            Some(at) => at <= Utc::now(),
            None => true,
        }
    }

    /// Mark the job as being processed. Does not increment attempts.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    /// Mark the job as successfully completed.
    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed, recording the error and counting the attempt.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = error.into();
        self.attempts += 1;
        self.updated_at = Utc::now();
    }

    /// Mark the job for another attempt.
    pub fn mark_retrying(&mut self) {
        self.status = JobStatus::Retrying;
        self.updated_at = Utc::now();
    }

    /// Schedule the job for future execution.
    pub fn schedule(&mut self, scheduled_for: DateTime<Utc>) {
        self.scheduled_for = Some(scheduled_for);
        self.updated_at = Utc::now();
    }

    /// Serialize the job into a dispatch-channel envelope.
    pub fn to_envelope(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize a job from a dispatch-channel envelope.
    pub fn from_envelope(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_job_starts_pending_with_zero_attempts() {
        let job = Job::new("default", "email", serde_json::json!({"to": "a@b.c"})).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.error.is_empty());
        assert!(job.scheduled_for.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn empty_queue_is_rejected() {
        let err = Job::new("", "email", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, QueueError::InvalidQueue));
    }

    #[test]
    fn empty_type_is_rejected() {
        let err = Job::new("default", "", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, QueueError::InvalidType));
    }

    #[test]
    fn lifecycle_walks_the_state_machine() {
        let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();

        job.mark_processing();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.attempts, 0);

        job.mark_failed("smtp timeout");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.error, "smtp timeout");

        job.mark_retrying();
        assert_eq!(job.status, JobStatus::Retrying);

        job.mark_processing();
        job.mark_completed();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn attempts_are_non_decreasing() {
        let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();
        let mut last = job.attempts;
        for _ in 0..4 {
            job.mark_failed("boom");
            assert!(job.attempts >= last);
            last = job.attempts;
            job.mark_retrying();
            job.mark_processing();
        }
        assert_eq!(job.attempts, 4);
    }

    #[test]
    fn can_retry_requires_failed_status_and_budget() {
        let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();
        assert!(!job.can_retry(3), "pending jobs are not retryable");

        job.mark_failed("boom");
        assert!(job.can_retry(3));

        job.mark_failed("boom");
        job.mark_failed("boom");
        assert_eq!(job.attempts, 3);
        assert!(!job.can_retry(3), "budget exhausted");
    }

    #[test]
    fn future_schedule_makes_job_not_ready() {
        let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();
        assert!(job.is_ready());

        job.schedule(Utc::now() + Duration::seconds(60));
        assert!(!job.is_ready());

        job.schedule(Utc::now() - Duration::seconds(1));
        assert!(job.is_ready());
    }

    #[test]
    fn processing_job_is_not_ready() {
        let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();
        job.mark_processing();
        assert!(!job.is_ready());
    }

    #[test]
    fn envelope_round_trips_all_fields() {
        let mut job = Job::new("default", "email", serde_json::json!({"k": 1})).unwrap();
        job.mark_failed("boom");
        job.schedule(Utc::now());

        let restored = Job::from_envelope(&job.to_envelope().unwrap()).unwrap();
        assert_eq!(restored, job);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!(matches!(
            "bogus".parse::<JobStatus>(),
            Err(QueueError::InvalidStatus(_))
        ));
    }
}
