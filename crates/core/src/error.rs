//! Domain error model.
//!
//! Domain errors represent **business logic failures** - validation errors,
//! invariant violations, missing resources. They are distinct from
//! infrastructure errors (network failures, database errors, etc.), which are
//! modeled per adapter; [`StoreError`] is the shared taxonomy for durable
//! storage adapters.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error (deterministic business failures).
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, lookups). Infrastructure concerns (network errors, database
/// errors, etc.) belong in adapter error types.
///
/// Errors are `Clone` and `PartialEq` so they can cross thread boundaries and
/// be compared in tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Error surfaced by durable storage adapters (metadata store).
///
/// `Unavailable` marks transient connectivity loss: callers surface it as
/// retryable (HTTP 5xx) and never drop it silently.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// The backing store could not be reached (connection loss, pool closed).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint was violated (e.g. id collision on insert).
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// A stored row could not be (de)serialized into its domain shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other query failure.
    #[error("storage error: {0}")]
    Storage(String),
}
