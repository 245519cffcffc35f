use std::sync::Arc;

use tokio::sync::watch;

use conveyor_api::app;
use conveyor_infra::{
    config, postgres, AnalyzerHttpClient, PostgresInsightRepository, PostgresJobRepository,
    RedisDispatchChannel, SimulatedExecutor,
};
use conveyor_insights::{InsightRepository, InsightsService};
use conveyor_queue::{DispatchChannel, JobRepository};
use conveyor_worker::{Executor, WorkerConfig, WorkerService};

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

    let config = match WorkerConfig::new(
        settings.worker.queue.clone(),
        settings.worker.max_attempts,
        settings.worker.base_backoff_ms,
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid worker configuration");
            std::process::exit(1);
        }
    };

    let jobs: Arc<dyn JobRepository> = Arc::new(PostgresJobRepository::new(
        pool.clone(),
        settings.worker.max_attempts,
    ));
    let insight_repo: Arc<dyn InsightRepository> = Arc::new(PostgresInsightRepository::new(pool));
    let channel: Arc<dyn DispatchChannel> = Arc::new(channel);
    let executor: Arc<dyn Executor> =
        Arc::new(SimulatedExecutor::from_settings(&settings.simulation));

    let insights_service = Arc::new(InsightsService::new(
        insight_repo,
        jobs.clone(),
        Arc::new(analyzer),
    ));

    let worker = WorkerService::new(jobs, channel, executor, Some(insights_service), config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        app::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    tracing::info!("worker runtime starting");
    worker.run(shutdown_rx).await;
}
