//! The worker loop: dequeue, execute, and drive the state machine.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use conveyor_core::StoreError;
use conveyor_insights::InsightsService;
use conveyor_queue::{ChannelError, DispatchChannel, Job, JobRepository};

use crate::backoff::backoff_delay;
use crate::config::WorkerConfig;
use crate::executor::Executor;

/// Ceiling for a detached analysis call (model cold start can be minutes).
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Drains a single queue, one job at a time.
///
/// Multiple worker processes may share a queue name; no coordination is
/// needed because every transition is persisted to the metadata store, which
/// stays authoritative over the envelopes in flight.
pub struct WorkerService {
    jobs: Arc<dyn JobRepository>,
    channel: Arc<dyn DispatchChannel>,
    executor: Arc<dyn Executor>,
    insights: Option<Arc<InsightsService>>,
    config: WorkerConfig,
}

impl WorkerService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        channel: Arc<dyn DispatchChannel>,
        executor: Arc<dyn Executor>,
        insights: Option<Arc<InsightsService>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            jobs,
            channel,
            executor,
            insights,
            config,
        }
    }

    /// Run the polling loop until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.config.queue,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "worker started"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(queue = %self.config.queue, "worker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.process_next_job(&mut shutdown).await {
                        error!(error = %e, queue = %self.config.queue, "error processing job");
                    }
                    // An inner select may have consumed the shutdown signal.
                    if *shutdown.borrow() {
                        info!(queue = %self.config.queue, "worker shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Process the next available job from the queue.
    ///
    /// Returns without error when interrupted by shutdown; the in-flight job
    /// stays recoverable through the metadata store.
    pub async fn process_next_job(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WorkerError> {
        debug!(queue = %self.config.queue, "polling queue for jobs");

        let mut job = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            job = self.channel.dequeue(&self.config.queue) => job?,
        };

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            attempt = job.attempts,
            "dequeued job"
        );

        job.mark_processing();
        self.jobs.update(&job).await?;

        if !self.executor.can_handle(&job.job_type) {
            let message = format!("no executor for job type: {}", job.job_type);
            warn!(job_id = %job.id, job_type = %job.job_type, "unhandled job type");
            return self.handle_failure(job, message, shutdown).await;
        }

        // The executor future is dropped on shutdown: the worker exits
        // without acknowledging and the row stays `processing` for operator
        // recovery.
        let result = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            result = self.executor.execute(&job) => result,
        };
        if !result.success {
            let message = result
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "job execution failed".to_string());
            warn!(job_id = %job.id, error = %message, "job execution failed");
            return self.handle_failure(job, message, shutdown).await;
        }

        job.mark_completed();
        self.jobs.update(&job).await?;
        self.channel.acknowledge(job.id).await?;

        info!(job_id = %job.id, job_type = %job.job_type, "job completed");
        Ok(())
    }

    /// Count the failure, fire analysis on the first one, then either retry
    /// with backoff or dead-letter.
    #[instrument(skip(self, job, shutdown), fields(job_id = %job.id))]
    async fn handle_failure(
        &self,
        mut job: Job,
        error: String,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WorkerError> {
        job.mark_failed(error);

        if job.attempts == 1 {
            if let Some(insights) = &self.insights {
                self.spawn_analysis(insights.clone(), &job);
            }
        }

        if job.can_retry(self.config.max_attempts) {
            let backoff = backoff_delay(job.attempts as i32, self.config.base_backoff_ms);
            job.schedule(
                chrono::Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default(),
            );
            job.mark_retrying();

            info!(
                attempt = job.attempts,
                max_attempts = self.config.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                "job will retry after backoff"
            );

            self.jobs.update(&job).await?;

            // Wait out the backoff, bailing early on shutdown; the metadata
            // row keeps the job recoverable if the re-push never happens.
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep(backoff) => {}
            }

            debug!("re-enqueueing job for retry");
            self.channel.enqueue(&job).await?;
            return Ok(());
        }

        warn!(
            attempts = job.attempts,
            reason = "max_attempts_exceeded",
            "job failed permanently, moving to DLQ"
        );
        self.jobs.move_to_dlq(job.id).await?;
        self.jobs.update(&job).await?;
        Ok(())
    }

    /// Detach the analysis call from the worker: its own task, its own
    /// deadline, so a slow analyzer never stalls dispatch.
    fn spawn_analysis(&self, insights: Arc<InsightsService>, job: &Job) {
        let job_id = job.id;
        info!(job_id = %job_id, attempt = job.attempts, "requesting analysis for failed job");

        tokio::spawn(async move {
            match tokio::time::timeout(ANALYSIS_TIMEOUT, insights.analyze(job_id)).await {
                Ok(Ok(insight)) => {
                    info!(job_id = %job_id, insight_id = %insight.id, "analysis complete");
                }
                Ok(Err(e)) => {
                    error!(job_id = %job_id, error = %e, "analysis failed");
                }
                Err(_) => {
                    error!(job_id = %job_id, "analysis timed out");
                }
            }
        });
    }

    /// Re-push metadata-store rows that are due but have no envelope in
    /// flight (e.g. after a crash between dequeue and the processing write,
    /// or a failed channel push).
    pub async fn requeue_pending(&self, limit: i64) -> Result<usize, WorkerError> {
        let jobs = self.jobs.find_pending(&self.config.queue, limit).await?;
        let mut pushed = 0;
        for job in &jobs {
            self.channel.enqueue(job).await?;
            pushed += 1;
        }
        if pushed > 0 {
            info!(count = pushed, queue = %self.config.queue, "re-dispatched pending jobs");
        }
        Ok(pushed)
    }
}
