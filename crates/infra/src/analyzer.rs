//! HTTP client for the remote analyzer service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;

use conveyor_insights::{
    AnalysisRequest, AnalysisResponse, AnalyzerError, AnalyzerService, SuggestedFix,
};

// AI analysis can take minutes on a cold model; size the timeout for it.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(300);

/// Calls the remote analyzer's `POST /api/insights/analyze` operation.
#[derive(Debug, Clone)]
pub struct AnalyzerHttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalyzerHttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder()
            .timeout(ANALYZE_TIMEOUT)
            .build()
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }
}

/// Wire shape of the analyzer's insight document. Identity fields it also
/// carries (`id`, `job_id`) are ignored here; the caller re-keys the result.
#[derive(Debug, Deserialize)]
struct InsightDocument {
    diagnosis: String,
    #[serde(default)]
    recommendation: String,
    #[serde(default)]
    suggested_fix: SuggestedFix,
}

#[async_trait]
impl AnalyzerService for AnalyzerHttpClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalyzerError> {
        // The analyzer takes job_id as a query parameter, not in the body.
        let url = format!(
            "{}/api/insights/analyze?job_id={}",
            self.base_url, request.job_id
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let document: InsightDocument = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Decode(e.to_string()))?;

        Ok(AnalysisResponse {
            diagnosis: document.diagnosis,
            recommendation: document.recommendation,
            suggested_fix: document.suggested_fix,
        })
    }
}
