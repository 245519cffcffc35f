//! Ports of the insights subsystem.

use async_trait::async_trait;

use conveyor_core::{InsightId, JobId, StoreError};

use crate::error::AnalyzerError;
use crate::insight::{AnalysisRequest, AnalysisResponse, Insight};

/// Durable persistence of insights.
#[async_trait]
pub trait InsightRepository: Send + Sync {
    async fn create(&self, insight: &Insight) -> Result<(), StoreError>;

    async fn get(&self, id: InsightId) -> Result<Option<Insight>, StoreError>;

    /// Cache lookup: the single insight for a job, if one exists.
    async fn get_by_job_id(&self, job_id: JobId) -> Result<Option<Insight>, StoreError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Insight>, StoreError>;

    async fn delete(&self, id: InsightId) -> Result<bool, StoreError>;
}

/// Remote analysis capability.
///
/// Implementations may take minutes to answer (model cold start); callers
/// that cannot wait must detach the call.
#[async_trait]
pub trait AnalyzerService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalyzerError>;
}
