use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use conveyor_core::{InsightId, JobId};

use crate::app::{dto, errors, AppServices};

/// Trigger analysis of a failed job; answers with the cached insight when one
/// already exists. May run for minutes on a cold analyzer.
pub async fn analyze_job(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AnalyzeQuery>,
) -> axum::response::Response {
    let job_id: JobId = match query.job_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_job_id", "invalid job id")
        }
    };

    match services.insights.analyze(job_id).await {
        Ok(insight) => {
            (StatusCode::OK, Json(dto::InsightResponse::from(insight))).into_response()
        }
        Err(e) => errors::insight_error_to_response(e),
    }
}

pub async fn get_insight(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InsightId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid insight id")
        }
    };

    match services.insights.insight(id).await {
        Ok(insight) => {
            (StatusCode::OK, Json(dto::InsightResponse::from(insight))).into_response()
        }
        Err(e) => errors::insight_error_to_response(e),
    }
}

/// List insights, or look a single one up by `job_id`.
pub async fn list_insights(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::InsightsQuery>,
) -> axum::response::Response {
    if let Some(job_id) = query.job_id {
        let job_id: JobId = match job_id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_job_id",
                    "invalid job id",
                )
            }
        };

        return match services.insights.insight_for_job(job_id).await {
            Ok(Some(insight)) => {
                (StatusCode::OK, Json(dto::InsightResponse::from(insight))).into_response()
            }
            Ok(None) => errors::json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                "no insight for that job",
            ),
            Err(e) => errors::insight_error_to_response(e),
        };
    }

    match services.insights.list_insights(query.limit, query.offset).await {
        Ok(insights) => {
            let insights: Vec<_> = insights
                .into_iter()
                .map(dto::InsightResponse::from)
                .collect();
            (StatusCode::OK, Json(insights)).into_response()
        }
        Err(e) => errors::insight_error_to_response(e),
    }
}
