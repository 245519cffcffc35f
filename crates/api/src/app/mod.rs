//! Application wiring: shared services and the HTTP router.

pub mod dto;
pub mod errors;
pub mod routes;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};

use conveyor_insights::InsightsService;
use conveyor_queue::QueueService;

/// Services shared by every handler.
pub struct AppServices {
    pub queue: QueueService,
    pub insights: Arc<InsightsService>,
    /// Attempt budget used by the retry endpoint.
    pub max_attempts: u32,
}

impl AppServices {
    pub fn new(queue: QueueService, insights: Arc<InsightsService>, max_attempts: u32) -> Self {
        Self {
            queue,
            insights,
            max_attempts,
        }
    }
}

/// Build the full HTTP surface.
pub fn build_router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::router())
        .layer(Extension(services))
}

async fn health() -> &'static str {
    "OK"
}

/// Resolves when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("received shutdown signal");
}
