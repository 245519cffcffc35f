//! Analyzer client and cache.
//!
//! Wraps the remote analyzer behind a cache check against the insight store,
//! so each job is analyzed at most once no matter how many times `analyze`
//! is called for it.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use conveyor_core::{InsightId, JobId};
use conveyor_queue::JobRepository;

use crate::error::InsightError;
use crate::insight::{AnalysisRequest, Insight};
use crate::ports::{AnalyzerService, InsightRepository};

pub struct InsightsService {
    insights: Arc<dyn InsightRepository>,
    jobs: Arc<dyn JobRepository>,
    analyzer: Arc<dyn AnalyzerService>,
}

impl InsightsService {
    pub fn new(
        insights: Arc<dyn InsightRepository>,
        jobs: Arc<dyn JobRepository>,
        analyzer: Arc<dyn AnalyzerService>,
    ) -> Self {
        Self {
            insights,
            jobs,
            analyzer,
        }
    }

    /// Analyze a failed job, returning the cached insight when one exists.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn analyze(&self, job_id: JobId) -> Result<Insight, InsightError> {
        if let Some(cached) = self.insights.get_by_job_id(job_id).await? {
            info!(insight_id = %cached.id, "using cached insight");
            return Ok(cached);
        }

        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(InsightError::JobNotFound)?;

        let request = AnalysisRequest {
            job_id: job.id.to_string(),
            error: job.error.clone(),
            payload: job.payload.to_string(),
        };

        info!(job_type = %job.job_type, "requesting analysis");
        let response = self.analyzer.analyze(&request).await?;

        let insight = Insight::from_analysis(job_id, response)?;
        self.insights.create(&insight).await?;

        info!(insight_id = %insight.id, "insight created");
        Ok(insight)
    }

    pub async fn insight(&self, id: InsightId) -> Result<Insight, InsightError> {
        self.insights.get(id).await?.ok_or(InsightError::NotFound)
    }

    pub async fn insight_for_job(&self, job_id: JobId) -> Result<Option<Insight>, InsightError> {
        Ok(self.insights.get_by_job_id(job_id).await?)
    }

    pub async fn list_insights(&self, limit: i64, offset: i64) -> Result<Vec<Insight>, InsightError> {
        Ok(self.insights.list(limit, offset).await?)
    }

    /// Apply an insight's suggested fix to its job: overlay the payload patch
    /// and, if a retry budget is recommended, mark the job for retry.
    ///
    /// Opt-in only; never part of the automatic failure pipeline.
    #[instrument(skip(self), fields(insight_id = %insight_id))]
    pub async fn apply_suggested_fix(&self, insight_id: InsightId) -> Result<(), InsightError> {
        let insight = self.insight(insight_id).await?;
        let mut job = self
            .jobs
            .get(insight.job_id)
            .await?
            .ok_or(InsightError::JobNotFound)?;

        if !insight.suggested_fix.payload_patch.is_empty() {
            job.payload = insight.apply_suggested_fix(&job.payload)?;
        }

        if insight.has_retry_recommendation() {
            job.mark_retrying();
        } else {
            warn!(job_id = %job.id, "fix applied without retry recommendation");
        }

        Ok(self.jobs.update(&job).await?)
    }
}
