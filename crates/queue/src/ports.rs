//! Ports of the job lifecycle engine.
//!
//! The metadata store is the source of truth for a job's fate; the dispatch
//! channel only transports advisory snapshots for worker wake-up. On any
//! disagreement the store wins.

use async_trait::async_trait;

use conveyor_core::{JobId, StoreError};

use crate::error::ChannelError;
use crate::job::{Job, JobStatus};

/// Durable persistence of jobs (the metadata store).
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job; fails with [`StoreError::Duplicate`] on id collision.
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Rewrite all mutable columns. `updated_at` must already be advanced by
    /// the caller (the entity mark methods do this).
    async fn update(&self, job: &Job) -> Result<(), StoreError>;

    /// Delete a job; returns whether a row existed.
    async fn delete(&self, id: JobId) -> Result<bool, StoreError>;

    /// Jobs in `pending`/`retrying` whose `scheduled_for` is unset or due,
    /// oldest first.
    async fn find_pending(&self, queue: &str, limit: i64) -> Result<Vec<Job>, StoreError>;

    async fn find_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>, StoreError>;

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, StoreError>;

    /// Dead-letter view: failed jobs that exhausted the attempt budget,
    /// most recently updated first.
    async fn dlq_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, StoreError>;

    async fn dlq_count(&self) -> Result<i64, StoreError>;

    /// Mark a job failed as it enters the dead-letter view. The DLQ is a
    /// filter over this store, not a separate table.
    async fn move_to_dlq(&self, id: JobId) -> Result<(), StoreError>;
}

/// Volatile, ordered hand-off of job envelopes to workers (the dispatch
/// channel).
///
/// Delivery is at-least-once: the envelope is a snapshot taken at enqueue
/// time, so consumers must re-read the metadata store for any decision that
/// depends on more than `id`, `queue`, `type` and `payload`.
#[async_trait]
pub trait DispatchChannel: Send + Sync {
    /// Append the job's envelope to the tail of its named queue.
    async fn enqueue(&self, job: &Job) -> Result<(), ChannelError>;

    /// Pop the oldest envelope from the named queue, blocking until one is
    /// available. Cancelled by dropping the future.
    async fn dequeue(&self, queue: &str) -> Result<Job, ChannelError>;

    /// Best-effort cleanup of per-job processing markers.
    async fn acknowledge(&self, id: JobId) -> Result<(), ChannelError>;
}

/// Counters for queue activity. Implementations are expected to be cheap and
/// internally synchronized; recording must never fail the caller.
pub trait MetricsSink: Send + Sync {
    fn job_created(&self, queue: &str, job_type: &str);
    fn job_completed(&self, queue: &str, job_type: &str);
    fn job_failed(&self, queue: &str, job_type: &str);
    fn job_retried(&self, queue: &str, job_type: &str);
}
