//! Postgres insight repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use conveyor_core::{InsightId, JobId, StoreError};
use conveyor_insights::{Insight, InsightRepository, SuggestedFix};

use super::map_sqlx_error;

const INSIGHT_COLUMNS: &str = "id, job_id, diagnosis, recommendation, suggested_fix, created_at";

#[derive(Debug, Clone)]
pub struct PostgresInsightRepository {
    pool: PgPool,
}

impl PostgresInsightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightRepository for PostgresInsightRepository {
    async fn create(&self, insight: &Insight) -> Result<(), StoreError> {
        let suggested_fix = serde_json::to_value(&insight.suggested_fix)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO insights (id, job_id, diagnosis, recommendation, suggested_fix, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(insight.id.as_uuid())
        .bind(insight.job_id.as_uuid())
        .bind(&insight.diagnosis)
        .bind(&insight.recommendation)
        .bind(suggested_fix)
        .bind(insight.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_insight", e))?;

        Ok(())
    }

    async fn get(&self, id: InsightId) -> Result<Option<Insight>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_insight", e))?;

        row.map(|r| insight_from_row(&r)).transpose()
    }

    async fn get_by_job_id(&self, job_id: JobId) -> Result<Option<Insight>, StoreError> {
        // The cache contract: at most one insight per job, oldest row wins.
        let row = sqlx::query(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE job_id = $1 ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_insight_by_job_id", e))?;

        row.map(|r| insight_from_row(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Insight>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_insights", e))?;

        rows.iter().map(insight_from_row).collect()
    }

    async fn delete(&self, id: InsightId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM insights WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_insight", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug)]
struct InsightRow {
    id: uuid::Uuid,
    job_id: uuid::Uuid,
    diagnosis: String,
    recommendation: String,
    suggested_fix: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for InsightRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(InsightRow {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            diagnosis: row.try_get("diagnosis")?,
            recommendation: row.try_get("recommendation")?,
            suggested_fix: row.try_get("suggested_fix")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn insight_from_row(row: &sqlx::postgres::PgRow) -> Result<Insight, StoreError> {
    let row = InsightRow::from_row(row).map_err(|e| {
        StoreError::Serialization(format!("failed to deserialize insight row: {e}"))
    })?;

    let suggested_fix: SuggestedFix = serde_json::from_value(row.suggested_fix)
        .map_err(|e| StoreError::Serialization(format!("invalid suggested_fix: {e}")))?;

    Ok(Insight {
        id: InsightId::from_uuid(row.id),
        job_id: JobId::from_uuid(row.job_id),
        diagnosis: row.diagnosis,
        recommendation: row.recommendation,
        suggested_fix,
        created_at: row.created_at,
    })
}
