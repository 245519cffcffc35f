use std::sync::Arc;

use conveyor_api::app::{self, AppServices};
use conveyor_infra::{
    config, postgres, AnalyzerHttpClient, PostgresInsightRepository, PostgresJobRepository,
    RedisDispatchChannel,
};
use conveyor_insights::{InsightRepository, InsightsService};
use conveyor_queue::{DispatchChannel, InMemoryMetrics, JobRepository, MetricsSink, QueueService};

#[tokio::main]
async fn main() {
    conveyor_observability::init();

    let settings = match config::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let pool = match postgres::connect(&settings.postgres.dsn).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "postgres connection error");
            std::process::exit(1);
        }
    };
    tracing::info!("connected to postgres");

    let channel = match RedisDispatchChannel::connect(&settings.redis.connection_url()).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::error!(error = %e, "redis connection error");
            std::process::exit(1);
        }
    };
    tracing::info!("connected to redis");

    let analyzer = match AnalyzerHttpClient::new(settings.ai.effective_url()) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            tracing::error!(error = %e, "failed to build analyzer client");
            std::process::exit(1);
        }
    };

    let jobs: Arc<dyn JobRepository> = Arc::new(PostgresJobRepository::new(
        pool.clone(),
        settings.worker.max_attempts,
    ));
    let insight_repo: Arc<dyn InsightRepository> = Arc::new(PostgresInsightRepository::new(pool));
    let channel: Arc<dyn DispatchChannel> = Arc::new(channel);
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());

    let queue_service = QueueService::new(jobs.clone(), channel, metrics);
    let insights_service = Arc::new(InsightsService::new(insight_repo, jobs, Arc::new(analyzer)));

    let services = Arc::new(AppServices::new(
        queue_service,
        insights_service,
        settings.worker.max_attempts,
    ));
    let router = app::build_router(services);

    let addr = format!("0.0.0.0:{}", settings.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %addr, "control service listening");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(app::shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
