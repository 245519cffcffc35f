//! Request/response shapes of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conveyor_insights::Insight;
use conveyor_queue::Job;

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub queue: String,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub queue: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct RetryQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    pub job_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub queue: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: String,
    pub attempts: u32,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<InsightResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobResponse {
    pub fn from_job(job: Job) -> Self {
        Self::with_insight(job, None)
    }

    pub fn with_insight(job: Job, insight: Option<Insight>) -> Self {
        Self {
            id: job.id.to_string(),
            queue: job.queue,
            job_type: job.job_type,
            status: job.status.to_string(),
            attempts: job.attempts,
            payload: job.payload,
            error: job.error,
            insight: insight.map(InsightResponse::from),
            scheduled_for: job.scheduled_for,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestedFixResponse {
    pub timeout_seconds: i64,
    pub max_retries: i64,
    pub payload_patch: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub id: String,
    pub job_id: String,
    pub diagnosis: String,
    pub recommendation: String,
    pub suggested_fix: SuggestedFixResponse,
    pub created_at: DateTime<Utc>,
}

impl From<Insight> for InsightResponse {
    fn from(insight: Insight) -> Self {
        Self {
            id: insight.id.to_string(),
            job_id: insight.job_id.to_string(),
            diagnosis: insight.diagnosis,
            recommendation: insight.recommendation,
            suggested_fix: SuggestedFixResponse {
                timeout_seconds: insight.suggested_fix.timeout_seconds,
                max_retries: insight.suggested_fix.max_retries,
                payload_patch: insight.suggested_fix.payload_patch,
            },
            created_at: insight.created_at,
        }
    }
}
