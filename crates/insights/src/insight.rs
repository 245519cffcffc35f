//! Insight entity: an AI-produced diagnosis for a failed job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conveyor_core::{InsightId, JobId};

use crate::error::InsightError;

/// AI-recommended fixes for a job failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedFix {
    /// Recommended execution timeout; 0 means no recommendation.
    #[serde(default)]
    pub timeout_seconds: i64,
    /// Recommended retry budget; 0 means no recommendation.
    #[serde(default)]
    pub max_retries: i64,
    /// Shallow overlay to merge into the job payload.
    #[serde(default)]
    pub payload_patch: serde_json::Map<String, serde_json::Value>,
}

/// Data sent to the analyzer for a failed job.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub job_id: String,
    pub error: String,
    pub payload: String,
}

/// The analyzer's answer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    pub diagnosis: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub suggested_fix: SuggestedFix,
}

/// An AI-generated analysis of a job failure. At most one exists per job;
/// the analyzer-client cache enforces this on the read side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: InsightId,
    pub job_id: JobId,
    pub diagnosis: String,
    pub recommendation: String,
    pub suggested_fix: SuggestedFix,
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Build an insight from an analysis response, rejecting empty results.
    pub fn from_analysis(job_id: JobId, response: AnalysisResponse) -> Result<Self, InsightError> {
        if job_id.as_uuid().is_nil() {
            return Err(InsightError::InvalidJobId);
        }
        if response.diagnosis.is_empty() {
            return Err(InsightError::InvalidAnalysisData(
                "empty diagnosis".to_string(),
            ));
        }

        Ok(Self {
            id: InsightId::new(),
            job_id,
            diagnosis: response.diagnosis,
            recommendation: response.recommendation,
            suggested_fix: response.suggested_fix,
            created_at: Utc::now(),
        })
    }

    /// Overlay the suggested payload patch onto a job payload (shallow merge).
    ///
    /// An empty patch returns the payload unchanged.
    pub fn apply_suggested_fix(
        &self,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, InsightError> {
        if self.suggested_fix.payload_patch.is_empty() {
            return Ok(payload.clone());
        }

        let mut object = payload
            .as_object()
            .cloned()
            .ok_or_else(|| InsightError::InvalidPayload(payload.to_string()))?;

        for (key, value) in &self.suggested_fix.payload_patch {
            object.insert(key.clone(), value.clone());
        }

        Ok(serde_json::Value::Object(object))
    }

    pub fn has_timeout_recommendation(&self) -> bool {
        self.suggested_fix.timeout_seconds > 0
    }

    pub fn has_retry_recommendation(&self) -> bool {
        self.suggested_fix.max_retries > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(diagnosis: &str) -> AnalysisResponse {
        AnalysisResponse {
            diagnosis: diagnosis.to_string(),
            recommendation: "increase the timeout".to_string(),
            suggested_fix: SuggestedFix::default(),
        }
    }

    #[test]
    fn from_analysis_rejects_nil_job_id() {
        let nil = JobId::from_uuid(uuid::Uuid::nil());
        let err = Insight::from_analysis(nil, response("timeout")).unwrap_err();
        assert!(matches!(err, InsightError::InvalidJobId));
    }

    #[test]
    fn from_analysis_rejects_empty_diagnosis() {
        let err = Insight::from_analysis(JobId::new(), response("")).unwrap_err();
        assert!(matches!(err, InsightError::InvalidAnalysisData(_)));
    }

    #[test]
    fn empty_patch_returns_payload_unchanged() {
        let insight = Insight::from_analysis(JobId::new(), response("timeout")).unwrap();
        let payload = serde_json::json!({"to": "a@b.c", "retries": 1});

        let patched = insight.apply_suggested_fix(&payload).unwrap();
        assert_eq!(patched, payload);
        assert_eq!(
            serde_json::to_vec(&patched).unwrap(),
            serde_json::to_vec(&payload).unwrap()
        );
    }

    #[test]
    fn patch_overrides_existing_keys_and_adds_new_ones() {
        let mut response = response("timeout");
        response.suggested_fix.payload_patch = serde_json::json!({
            "timeout": 30,
            "to": "fixed@b.c",
        })
        .as_object()
        .unwrap()
        .clone();
        let insight = Insight::from_analysis(JobId::new(), response).unwrap();

        let payload = serde_json::json!({"to": "a@b.c", "subject": "hi"});
        let patched = insight.apply_suggested_fix(&payload).unwrap();

        assert_eq!(patched["to"], "fixed@b.c");
        assert_eq!(patched["subject"], "hi");
        assert_eq!(patched["timeout"], 30);
    }

    #[test]
    fn patch_on_non_object_payload_fails() {
        let mut response = response("timeout");
        response.suggested_fix.payload_patch = serde_json::json!({"k": 1})
            .as_object()
            .unwrap()
            .clone();
        let insight = Insight::from_analysis(JobId::new(), response).unwrap();

        let err = insight
            .apply_suggested_fix(&serde_json::json!([1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, InsightError::InvalidPayload(_)));
    }

    #[test]
    fn recommendation_flags_follow_the_fix() {
        let mut response = response("timeout");
        response.suggested_fix.timeout_seconds = 30;
        let insight = Insight::from_analysis(JobId::new(), response).unwrap();
        assert!(insight.has_timeout_recommendation());
        assert!(!insight.has_retry_recommendation());
    }
}
