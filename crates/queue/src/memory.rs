//! In-memory adapters for dev/test.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use conveyor_core::{JobId, StoreError};

use crate::error::ChannelError;
use crate::job::{Job, JobStatus};
use crate::ports::{DispatchChannel, JobRepository, MetricsSink};

/// In-memory job repository for tests/dev.
#[derive(Debug)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    max_attempts: u32,
}

impl InMemoryJobRepository {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            max_attempts,
        }
    }

    pub fn arc(max_attempts: u32) -> Arc<Self> {
        Arc::new(Self::new(max_attempts))
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id.to_string()));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().unwrap().get(&id).cloned())
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(StoreError::Storage(format!("job not found: {}", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn delete(&self, id: JobId) -> Result<bool, StoreError> {
        Ok(self.jobs.write().unwrap().remove(&id).is_some())
    }

    async fn find_pending(&self, queue: &str, limit: i64) -> Result<Vec<Job>, StoreError> {
        let now = Utc::now();
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| {
                j.queue == queue
                    && matches!(j.status, JobStatus::Pending | JobStatus::Retrying)
                    && j.scheduled_for.map_or(true, |at| at <= now)
            })
            .cloned()
            .collect();
        result.sort_by_key(|j| j.created_at);
        result.truncate(limit.max(0) as usize);
        Ok(result)
    }

    async fn find_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        result.sort_by_key(|j| j.created_at);
        result.truncate(limit.max(0) as usize);
        Ok(result)
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, StoreError> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.values().filter(|j| j.status == status).count() as i64)
    }

    async fn dlq_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Failed && j.attempts >= self.max_attempts)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn dlq_count(&self) -> Result<i64, StoreError> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs
            .values()
            .filter(|j| j.status == JobStatus::Failed && j.attempts >= self.max_attempts)
            .count() as i64)
    }

    async fn move_to_dlq(&self, id: JobId) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::Storage(format!("job not found: {id}")))?;
        job.status = JobStatus::Failed;
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Vec<u8>>,
    notify: Arc<Notify>,
}

/// In-memory dispatch channel: FIFO per queue name with a blocking pop.
#[derive(Debug, Default)]
pub struct InMemoryDispatchChannel {
    queues: Mutex<HashMap<String, QueueState>>,
    acked: Mutex<HashSet<JobId>>,
}

impl InMemoryDispatchChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of envelopes currently waiting on the named queue.
    pub fn depth(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue)
            .map_or(0, |q| q.items.len())
    }

    /// Job ids acknowledged so far.
    pub fn acknowledged(&self) -> HashSet<JobId> {
        self.acked.lock().unwrap().clone()
    }

    fn notify_for(&self, queue: &str) -> Arc<Notify> {
        let mut queues = self.queues.lock().unwrap();
        queues.entry(queue.to_string()).or_default().notify.clone()
    }

    fn pop(&self, queue: &str) -> Option<Vec<u8>> {
        let mut queues = self.queues.lock().unwrap();
        queues.get_mut(queue).and_then(|q| q.items.pop_front())
    }
}

#[async_trait]
impl DispatchChannel for InMemoryDispatchChannel {
    async fn enqueue(&self, job: &Job) -> Result<(), ChannelError> {
        let bytes = job
            .to_envelope()
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(job.queue.clone()).or_default();
        state.items.push_back(bytes);
        state.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, queue: &str) -> Result<Job, ChannelError> {
        let notify = self.notify_for(queue);
        loop {
            // Register interest before checking, so an enqueue racing with the
            // check leaves a wake-up permit behind.
            let notified = notify.notified();
            if let Some(bytes) = self.pop(queue) {
                return Job::from_envelope(&bytes)
                    .map_err(|e| ChannelError::Serialization(e.to_string()));
            }
            notified.await;
        }
    }

    async fn acknowledge(&self, id: JobId) -> Result<(), ChannelError> {
        self.acked.lock().unwrap().insert(id);
        Ok(())
    }
}

/// In-memory activity counters, keyed `<event>:<queue>:<type>`.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, i64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn snapshot(&self) -> HashMap<String, i64> {
        self.counters.lock().unwrap().clone()
    }

    fn bump(&self, event: &str, queue: &str, job_type: &str) {
        let mut counters = self.counters.lock().unwrap();
        *counters
            .entry(format!("{event}:{queue}:{job_type}"))
            .or_default() += 1;
    }
}

impl MetricsSink for InMemoryMetrics {
    fn job_created(&self, queue: &str, job_type: &str) {
        self.bump("created", queue, job_type);
    }

    fn job_completed(&self, queue: &str, job_type: &str) {
        self.bump("completed", queue, job_type);
    }

    fn job_failed(&self, queue: &str, job_type: &str) {
        self.bump("failed", queue, job_type);
    }

    fn job_retried(&self, queue: &str, job_type: &str) {
        self.bump("retried", queue, job_type);
    }
}
