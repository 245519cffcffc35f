//! Reference executor with realistic failure simulation.

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use conveyor_queue::Job;
use conveyor_worker::{ExecutionResult, Executor};

use crate::config::SimulationSettings;

const EMAIL_ERRORS: &[&str] = &[
    "failed to connect to SMTP server: connection timeout",
    "SMTP authentication failed: invalid credentials",
    "email rejected by recipient server: mailbox full",
    "email size exceeds maximum allowed limit",
    "DNS lookup failed for mail server",
];

const NOTIFICATION_ERRORS: &[&str] = &[
    "push notification service unavailable",
    "invalid device token",
    "notification payload too large",
    "rate limit exceeded for notifications",
    "failed to establish SSL connection",
];

const DATA_PROCESSING_ERRORS: &[&str] = &[
    "out of memory during data processing",
    "invalid data format: JSON parsing error",
    "database connection lost during transaction",
    "data validation failed: missing required fields",
    "processing timeout exceeded",
];

/// Executor for the built-in job types, with failure injection for
/// exercising the retry pipeline in development.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    enabled: bool,
    failure_rate: f64,
}

impl SimulatedExecutor {
    pub fn new(enabled: bool, failure_rate: f64) -> Self {
        Self {
            enabled,
            failure_rate,
        }
    }

    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self::new(settings.enabled, settings.failure_rate)
    }

    fn should_fail(&self) -> bool {
        self.enabled && rand::thread_rng().gen::<f64>() < self.failure_rate
    }

    fn random_error(job_type: &str) -> String {
        let pool = match job_type {
            "email" => EMAIL_ERRORS,
            "notification" => NOTIFICATION_ERRORS,
            "data_processing" => DATA_PROCESSING_ERRORS,
            other => return format!("unknown error processing {other} job"),
        };
        pool[rand::thread_rng().gen_range(0..pool.len())].to_string()
    }

    fn simulate(&self, job: &Job, success_message: &str) -> ExecutionResult {
        if self.should_fail() {
            let error = Self::random_error(&job.job_type);
            warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                error = %error,
                simulated = true,
                "simulating job failure"
            );
            return ExecutionResult::failure(error);
        }

        info!(job_id = %job.id, job_type = %job.job_type, "job handled");
        ExecutionResult::success_with(serde_json::Value::String(success_message.to_string()))
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    fn can_handle(&self, job_type: &str) -> bool {
        matches!(job_type, "email" | "notification" | "data_processing")
    }

    async fn execute(&self, job: &Job) -> ExecutionResult {
        let payload = match job.payload.as_object() {
            Some(payload) => payload,
            None => return ExecutionResult::failure("invalid payload: expected a JSON object"),
        };

        match job.job_type.as_str() {
            "email" => {
                info!(
                    job_id = %job.id,
                    to = %payload.get("to").cloned().unwrap_or_default(),
                    subject = %payload.get("subject").cloned().unwrap_or_default(),
                    "sending email"
                );
                self.simulate(job, "Email sent successfully")
            }
            "notification" => {
                info!(
                    job_id = %job.id,
                    message = %payload.get("message").cloned().unwrap_or_default(),
                    "sending notification"
                );
                self.simulate(job, "Notification sent successfully")
            }
            "data_processing" => {
                info!(job_id = %job.id, "processing data");
                self.simulate(job, "Data processed successfully")
            }
            other => ExecutionResult::failure(format!("unsupported job type: {other}")),
        }
    }
}
