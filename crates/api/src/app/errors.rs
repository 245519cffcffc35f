//! Mapping of service errors onto the HTTP taxonomy.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use conveyor_core::StoreError;
use conveyor_insights::InsightError;
use conveyor_queue::QueueError;

pub fn queue_error_to_response(err: QueueError) -> axum::response::Response {
    match err {
        QueueError::InvalidQueue | QueueError::InvalidType => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        QueueError::InvalidStatus(s) => json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("invalid job status: {s}"),
        ),
        QueueError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        QueueError::MaxAttemptsReached => json_error(
            StatusCode::BAD_REQUEST,
            "max_attempts_reached",
            "maximum retry attempts reached",
        ),
        QueueError::Store(e) => store_error_to_response(e),
        QueueError::Channel(e) => {
            json_error(StatusCode::BAD_GATEWAY, "channel_error", e.to_string())
        }
    }
}

pub fn insight_error_to_response(err: InsightError) -> axum::response::Response {
    match err {
        InsightError::InvalidJobId => {
            json_error(StatusCode::BAD_REQUEST, "invalid_job_id", "invalid job id")
        }
        InsightError::InvalidAnalysisData(msg) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_analysis_data",
            msg,
        ),
        InsightError::InvalidPayload(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_payload", msg)
        }
        InsightError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "insight not found")
        }
        InsightError::JobNotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "job not found")
        }
        InsightError::Store(e) => store_error_to_response(e),
        InsightError::Analyzer(e) => {
            json_error(StatusCode::BAD_GATEWAY, "analyzer_unavailable", e.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        e => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
