//! Control service: the primary adapter for job lifecycle requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument};

use conveyor_core::JobId;

use crate::error::QueueError;
use crate::job::{Job, JobStatus};
use crate::ports::{DispatchChannel, JobRepository, MetricsSink};

/// Data needed to create a job.
#[derive(Debug, Clone)]
pub struct CreateJob {
    pub queue: String,
    pub job_type: String,
    pub payload: serde_json::Value,
}

/// Orchestrates submissions, queries, retries and the DLQ view.
///
/// Writes go to the metadata store first and the dispatch channel second: a
/// failed channel push leaves a pending row behind (recoverable by a sweep or
/// a manual retry) instead of a dispatched-but-unpersisted job.
pub struct QueueService {
    jobs: Arc<dyn JobRepository>,
    channel: Arc<dyn DispatchChannel>,
    metrics: Arc<dyn MetricsSink>,
}

impl QueueService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        channel: Arc<dyn DispatchChannel>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            jobs,
            channel,
            metrics,
        }
    }

    /// Create a new job: validate, persist, enqueue.
    #[instrument(skip(self, cmd), fields(queue = %cmd.queue, job_type = %cmd.job_type))]
    pub async fn create_job(&self, cmd: CreateJob) -> Result<Job, QueueError> {
        let job = Job::new(cmd.queue, cmd.job_type, cmd.payload)?;

        self.jobs.create(&job).await?;
        self.channel.enqueue(&job).await?;
        self.metrics.job_created(&job.queue, &job.job_type);

        info!(job_id = %job.id, "job created");
        Ok(job)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, QueueError> {
        self.jobs.get(id).await?.ok_or(QueueError::NotFound)
    }

    pub async fn jobs_by_status(
        &self,
        status: JobStatus,
        limit: i64,
    ) -> Result<Vec<Job>, QueueError> {
        Ok(self.jobs.find_by_status(status, limit).await?)
    }

    /// Apply a status transition requested from outside the worker loop.
    pub async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<(), QueueError> {
        let mut job = self.get_job(id).await?;

        match status {
            JobStatus::Processing => job.mark_processing(),
            JobStatus::Completed => {
                job.mark_completed();
                self.metrics.job_completed(&job.queue, &job.job_type);
            }
            JobStatus::Failed => {
                job.mark_failed("marked failed");
                self.metrics.job_failed(&job.queue, &job.job_type);
            }
            JobStatus::Retrying => job.mark_retrying(),
            JobStatus::Pending => {
                return Err(QueueError::InvalidStatus("pending".to_string()));
            }
        }

        Ok(self.jobs.update(&job).await?)
    }

    /// Retry a failed job: mark it retrying and push a fresh envelope.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn retry_job(&self, id: JobId, max_attempts: u32) -> Result<(), QueueError> {
        let mut job = self.get_job(id).await?;

        if !job.can_retry(max_attempts) {
            return Err(QueueError::MaxAttemptsReached);
        }

        job.mark_retrying();
        self.jobs.update(&job).await?;
        self.channel.enqueue(&job).await?;
        self.metrics.job_retried(&job.queue, &job.job_type);

        info!(attempt = job.attempts, "job retry initiated");
        Ok(())
    }

    /// Dead-letter view with its total count.
    pub async fn dlq_jobs(&self, limit: i64, offset: i64) -> Result<(Vec<Job>, i64), QueueError> {
        let jobs = self.jobs.dlq_jobs(limit, offset).await?;
        let total = self.jobs.dlq_count().await?;
        Ok((jobs, total))
    }

    pub async fn delete_job(&self, id: JobId) -> Result<(), QueueError> {
        if !self.jobs.delete(id).await? {
            return Err(QueueError::NotFound);
        }
        Ok(())
    }

    /// Counts per status plus the DLQ size.
    pub async fn metrics(&self) -> Result<BTreeMap<String, i64>, QueueError> {
        let mut metrics = BTreeMap::new();
        for status in JobStatus::ALL {
            let count = self.jobs.count_by_status(status).await?;
            metrics.insert(status.as_str().to_string(), count);
        }
        metrics.insert("dlq".to_string(), self.jobs.dlq_count().await?);
        Ok(metrics)
    }
}
