use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use conveyor_core::JobId;
use conveyor_queue::{CreateJob, JobStatus};

use crate::app::{dto, errors, AppServices};

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    let cmd = CreateJob {
        queue: body.queue,
        job_type: body.job_type,
        payload: body.payload,
    };

    match services.queue.create_job(cmd).await {
        Ok(job) => (StatusCode::CREATED, Json(dto::JobResponse::from_job(job))).into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let job = match services.queue.get_job(id).await {
        Ok(job) => job,
        Err(e) => return errors::queue_error_to_response(e),
    };

    // Opportunistically attach the insight once the job has failed.
    let insight = if job.status == JobStatus::Failed {
        services.insights.insight_for_job(id).await.ok().flatten()
    } else {
        None
    };

    (StatusCode::OK, Json(dto::JobResponse::with_insight(job, insight))).into_response()
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    tracing::debug!(
        status = query.status.as_deref().unwrap_or(""),
        queue = query.queue.as_deref().unwrap_or(""),
        limit = query.limit,
        offset = query.offset,
        "listing jobs"
    );

    let Some(status) = query.status else {
        // Listing without a status filter is not supported yet.
        return (StatusCode::OK, Json(Vec::<dto::JobResponse>::new())).into_response();
    };

    let status: JobStatus = match status.parse() {
        Ok(v) => v,
        Err(e) => return errors::queue_error_to_response(e),
    };

    match services.queue.jobs_by_status(status, query.limit).await {
        Ok(jobs) => {
            let jobs: Vec<_> = jobs.into_iter().map(dto::JobResponse::from_job).collect();
            (StatusCode::OK, Json(jobs)).into_response()
        }
        Err(e) => errors::queue_error_to_response(e),
    }
}

pub async fn retry_job(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::RetryQuery>,
) -> axum::response::Response {
    let id: JobId = match query.id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match services.queue.retry_job(id, services.max_attempts).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "retrying"})),
        )
            .into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}

pub async fn get_dlq(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    match services.queue.dlq_jobs(query.limit, query.offset).await {
        Ok((jobs, total)) => {
            let jobs: Vec<_> = jobs.into_iter().map(dto::JobResponse::from_job).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "jobs": jobs,
                    "total": total,
                    "limit": query.limit,
                    "offset": query.offset,
                })),
            )
                .into_response()
        }
        Err(e) => errors::queue_error_to_response(e),
    }
}

pub async fn get_metrics(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queue.metrics().await {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}
