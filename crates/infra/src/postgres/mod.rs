//! Postgres-backed metadata store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows: connection-level
//! failures (pool closed, pool timeout, I/O) become `Unavailable` so callers
//! can surface them as retryable; unique violations (`23505`) become
//! `Duplicate`; everything else is `Storage`.

pub mod insight_repository;
pub mod job_repository;

pub use insight_repository::PostgresInsightRepository;
pub use job_repository::PostgresJobRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use conveyor_core::StoreError;

/// Connect a pool and verify the database answers.
pub async fn connect(dsn: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(dsn)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

/// Map SQLx errors to the store error taxonomy.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool failure in {operation}: {err}"))
        }
        sqlx::Error::Io(e) => {
            StoreError::Unavailable(format!("connection failure in {operation}: {e}"))
        }
        err => StoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}
