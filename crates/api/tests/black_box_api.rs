//! Black-box tests: the real router on an ephemeral port, a live worker on
//! the same stores, driven through HTTP with reqwest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::watch;

use conveyor_api::app::{build_router, AppServices};
use conveyor_insights::{
    AnalysisRequest, AnalysisResponse, AnalyzerError, AnalyzerService, InMemoryInsightRepository,
    Insight, InsightRepository, InsightsService, SuggestedFix,
};
use conveyor_queue::{
    InMemoryDispatchChannel, InMemoryJobRepository, InMemoryMetrics, Job, JobRepository,
    QueueService,
};
use conveyor_worker::{ExecutionResult, Executor, WorkerConfig, WorkerService};

const MAX_ATTEMPTS: u32 = 3;

/// Executor double that fails a fixed number of times, then succeeds.
struct ScriptedExecutor {
    failures: AtomicUsize,
}

impl ScriptedExecutor {
    fn failing_times(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
        }
    }

    fn always_ok() -> Self {
        Self::failing_times(0)
    }

    fn always_failing() -> Self {
        Self::failing_times(usize::MAX)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    fn can_handle(&self, _job_type: &str) -> bool {
        true
    }

    async fn execute(&self, _job: &Job) -> ExecutionResult {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures.store(remaining - 1, Ordering::SeqCst);
            }
            ExecutionResult::failure("smtp connection timeout")
        } else {
            ExecutionResult::success()
        }
    }
}

struct CountingAnalyzer {
    calls: AtomicUsize,
}

impl CountingAnalyzer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzerService for CountingAnalyzer {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResponse, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AnalysisResponse {
            diagnosis: "transient smtp failure".to_string(),
            recommendation: "retry with a longer timeout".to_string(),
            suggested_fix: SuggestedFix::default(),
        })
    }
}

struct TestServer {
    base_url: String,
    server: tokio::task::JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    jobs: Arc<InMemoryJobRepository>,
    channel: Arc<InMemoryDispatchChannel>,
    insights: Arc<InMemoryInsightRepository>,
    analyzer: Arc<CountingAnalyzer>,
}

impl TestServer {
    /// Spawn the prod router plus one worker on shared in-memory stores.
    async fn spawn(executor: ScriptedExecutor) -> Self {
        let jobs = InMemoryJobRepository::arc(MAX_ATTEMPTS);
        let channel = InMemoryDispatchChannel::arc();
        let insights = InMemoryInsightRepository::arc();
        let analyzer = Arc::new(CountingAnalyzer::new());
        let metrics = InMemoryMetrics::arc();

        let insights_service = Arc::new(InsightsService::new(
            insights.clone(),
            jobs.clone(),
            analyzer.clone(),
        ));
        let queue_service = QueueService::new(jobs.clone(), channel.clone(), metrics);
        let services = Arc::new(AppServices::new(
            queue_service,
            insights_service.clone(),
            MAX_ATTEMPTS,
        ));

        let app = build_router(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Worker with fast polling and a small backoff base.
        let config = WorkerConfig::new("default", MAX_ATTEMPTS, 5)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        let worker = WorkerService::new(
            jobs.clone(),
            channel.clone(),
            Arc::new(executor),
            Some(insights_service),
            config,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move { worker.run(shutdown_rx).await });

        Self {
            base_url,
            server,
            shutdown_tx,
            jobs,
            channel,
            insights,
            analyzer,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.server.abort();
    }
}

async fn create_job(
    client: &reqwest::Client,
    srv: &TestServer,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(srv.url("/api/jobs"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

/// Poll until the job reaches the wanted status (the worker runs async).
async fn wait_for_status(
    client: &reqwest::Client,
    srv: &TestServer,
    id: &str,
    status: &str,
) -> serde_json::Value {
    for _ in 0..200 {
        let res = client
            .get(srv.url(&format!("/api/jobs/{}", id)))
            .send()
            .await
            .unwrap();
        if res.status() == StatusCode::OK {
            let body: serde_json::Value = res.json().await.unwrap();
            if body["status"] == status {
                return body;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not reach status {status} within timeout");
}

#[tokio::test]
async fn health_answers_ok() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn happy_path_job_completes_without_insight() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": "noop", "payload": {}}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["status"], "pending");
    assert_eq!(created["attempts"], 0);

    let id = created["id"].as_str().unwrap();
    let done = wait_for_status(&client, &srv, id, "completed").await;
    assert_eq!(done["attempts"], 0);
    assert!(done.get("insight").is_none());
    assert_eq!(srv.analyzer.calls(), 0);
}

#[tokio::test]
async fn empty_queue_is_rejected_without_side_effects() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "", "type": "noop"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(srv.channel.depth("default"), 0);
}

#[tokio::test]
async fn empty_type_is_rejected() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": ""}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unknown_and_malformed_job_ids() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url(&format!("/api/jobs/{}", uuid::Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/api/jobs/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn single_retry_then_success_analyzes_once() {
    let srv = TestServer::spawn(ScriptedExecutor::failing_times(1)).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": "email", "payload": {"to": "a@b.c"}}),
    )
    .await;
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    let done = wait_for_status(&client, &srv, id, "completed").await;
    assert_eq!(done["attempts"], 1);
    assert_eq!(done["error"], "smtp connection timeout");

    // Exactly one insight for the first failure.
    let mut insight = None;
    for _ in 0..200 {
        let res = client
            .get(srv.url(&format!("/api/insights?job_id={}", id)))
            .send()
            .await
            .unwrap();
        if res.status() == StatusCode::OK {
            insight = Some(res.json::<serde_json::Value>().await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let insight = insight.expect("insight was never created");
    assert_eq!(insight["job_id"], id);
    assert_eq!(insight["diagnosis"], "transient smtp failure");
    assert_eq!(srv.analyzer.calls(), 1);
}

#[tokio::test]
async fn exhausted_job_lands_in_dlq_and_refuses_retry() {
    let srv = TestServer::spawn(ScriptedExecutor::always_failing()).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": "email", "payload": {}}),
    )
    .await;
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    // Wait until the attempt budget is exhausted.
    let mut dead = wait_for_status(&client, &srv, id, "failed").await;
    for _ in 0..200 {
        if dead["attempts"] == MAX_ATTEMPTS {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        dead = wait_for_status(&client, &srv, id, "failed").await;
    }
    assert_eq!(dead["attempts"], MAX_ATTEMPTS);

    let res = client.get(srv.url("/api/dlq")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let dlq: serde_json::Value = res.json().await.unwrap();
    assert_eq!(dlq["total"], 1);
    assert_eq!(dlq["jobs"][0]["id"], id);

    // Retrying a dead-lettered job is a client error, with no dispatch.
    let res = client
        .post(srv.url(&format!("/api/jobs/retry?id={}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "max_attempts_reached");
    assert_eq!(srv.channel.depth("default"), 0);

    // One insight total, from the first failure.
    assert_eq!(srv.analyzer.calls(), 1);

    // The failed job embeds its insight opportunistically.
    let res = client
        .get(srv.url(&format!("/api/jobs/{}", id)))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["insight"]["diagnosis"], "transient smtp failure");
}

#[tokio::test]
async fn analyze_endpoint_caches_per_job() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    // Seed a failed job directly; no worker involvement needed here.
    let mut job = Job::new("default", "email", serde_json::json!({"to": "a@b.c"})).unwrap();
    job.mark_failed("smtp timeout");
    srv.jobs.create(&job).await.unwrap();

    let res = client
        .post(srv.url(&format!("/api/insights/analyze?job_id={}", job.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(srv.url(&format!("/api/insights/analyze?job_id={}", job.id)))
        .send()
        .await
        .unwrap();
    let second: serde_json::Value = res.json().await.unwrap();

    assert_eq!(first["id"], second["id"]);
    assert_eq!(srv.analyzer.calls(), 1, "cache hit skips the analyzer");
}

#[tokio::test]
async fn insights_can_be_fetched_and_listed() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let mut job = Job::new("default", "email", serde_json::json!({})).unwrap();
    job.mark_failed("boom");
    srv.jobs.create(&job).await.unwrap();

    let insight = Insight::from_analysis(
        job.id,
        AnalysisResponse {
            diagnosis: "mailbox full".to_string(),
            recommendation: String::new(),
            suggested_fix: SuggestedFix::default(),
        },
    )
    .unwrap();
    srv.insights.create(&insight).await.unwrap();

    let res = client
        .get(srv.url(&format!("/api/insights/{}", insight.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["diagnosis"], "mailbox full");

    let res = client
        .get(srv.url("/api/insights?limit=10&offset=0"))
        .send()
        .await
        .unwrap();
    let list: serde_json::Value = res.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let res = client
        .get(srv.url(&format!("/api/insights/{}", uuid::Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_jobs_filters_by_status_only() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    // Listing without a filter is a known gap and answers empty.
    let res = client.get(srv.url("/api/jobs")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 0);

    let res = client
        .get(srv.url("/api/jobs?status=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": "email", "payload": {}}),
    )
    .await;

    let res = client
        .get(srv.url("/api/jobs?status=completed&limit=10"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_expose_status_counts_and_dlq() {
    let srv = TestServer::spawn(ScriptedExecutor::always_ok()).await;
    let client = reqwest::Client::new();

    let res = create_job(
        &client,
        &srv,
        serde_json::json!({"queue": "default", "type": "email", "payload": {}}),
    )
    .await;
    let created: serde_json::Value = res.json().await.unwrap();
    wait_for_status(&client, &srv, created["id"].as_str().unwrap(), "completed").await;

    let res = client.get(srv.url("/api/metrics")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let metrics: serde_json::Value = res.json().await.unwrap();
    assert_eq!(metrics["completed"], 1);
    assert_eq!(metrics["dlq"], 0);
    assert!(metrics.get("pending").is_some());
    assert!(metrics.get("failed").is_some());
}
