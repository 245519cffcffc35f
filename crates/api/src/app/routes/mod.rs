use axum::{
    routing::{get, post},
    Router,
};

pub mod insights;
pub mod jobs;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/retry", post(jobs::retry_job))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/dlq", get(jobs::get_dlq))
        .route("/metrics", get(jobs::get_metrics))
        .route("/insights", get(insights::list_insights))
        .route("/insights/analyze", post(insights::analyze_job))
        .route("/insights/:id", get(insights::get_insight))
}
