//! Postgres job repository.

use core::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use conveyor_core::{JobId, StoreError};
use conveyor_queue::{Job, JobRepository, JobStatus};

use super::map_sqlx_error;

const JOB_COLUMNS: &str =
    "id, queue, type, status, attempts, payload, error, scheduled_for, created_at, updated_at";

/// Job repository backed by the `jobs` table.
///
/// The DLQ is a filter over this table: `status = 'failed'` with `attempts`
/// at or past the configured budget.
#[derive(Debug, Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
    max_attempts: i64,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts: i64::from(max_attempts),
        }
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, queue, type, status, attempts, payload, error,
                              scheduled_for, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.queue)
        .bind(&job.job_type)
        .bind(job.status.as_str())
        .bind(job.attempts as i32)
        .bind(&job.payload)
        .bind(&job.error)
        .bind(job.scheduled_for)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_job", e))?;

        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_job", e))?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, attempts = $2, payload = $3, error = $4,
                scheduled_for = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.attempts as i32)
        .bind(&job.payload)
        .bind(&job.error)
        .bind(job.scheduled_for)
        .bind(job.updated_at)
        .bind(job.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_job", e))?;

        Ok(())
    }

    async fn delete(&self, id: JobId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_job", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending(&self, queue: &str, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE queue = $1 AND status IN ('pending', 'retrying')
              AND (scheduled_for IS NULL OR scheduled_for <= NOW())
            ORDER BY created_at ASC
            LIMIT $2
            "#
        ))
        .bind(queue)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_pending", e))?;

        rows.iter().map(job_from_row).collect()
    }

    async fn find_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = $1 ORDER BY created_at ASC LIMIT $2"
        ))
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_status", e))?;

        rows.iter().map(job_from_row).collect()
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_by_status", e))?;

        row.try_get("total")
            .map_err(|e| StoreError::Serialization(format!("failed to read count: {e}")))
    }

    async fn dlq_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE status = 'failed' AND attempts >= $1
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(self.max_attempts)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("dlq_jobs", e))?;

        rows.iter().map(job_from_row).collect()
    }

    async fn dlq_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM jobs WHERE status = 'failed' AND attempts >= $1",
        )
        .bind(self.max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("dlq_count", e))?;

        row.try_get("total")
            .map_err(|e| StoreError::Serialization(format!("failed to read count: {e}")))
    }

    async fn move_to_dlq(&self, id: JobId) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET status = 'failed', updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("move_to_dlq", e))?;

        Ok(())
    }
}

#[derive(Debug)]
struct JobRow {
    id: uuid::Uuid,
    queue: String,
    job_type: String,
    status: String,
    attempts: i32,
    payload: serde_json::Value,
    error: String,
    scheduled_for: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for JobRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(JobRow {
            id: row.try_get("id")?,
            queue: row.try_get("queue")?,
            job_type: row.try_get("type")?,
            status: row.try_get("status")?,
            attempts: row.try_get("attempts")?,
            payload: row.try_get("payload")?,
            error: row.try_get("error")?,
            scheduled_for: row.try_get("scheduled_for")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<Job, StoreError> {
    let row = JobRow::from_row(row)
        .map_err(|e| StoreError::Serialization(format!("failed to deserialize job row: {e}")))?;

    let status = JobStatus::from_str(&row.status)
        .map_err(|_| StoreError::Serialization(format!("unknown job status: {}", row.status)))?;

    Ok(Job {
        id: JobId::from_uuid(row.id),
        queue: row.queue,
        job_type: row.job_type,
        status,
        attempts: row.attempts.max(0) as u32,
        payload: row.payload,
        error: row.error,
        scheduled_for: row.scheduled_for,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
