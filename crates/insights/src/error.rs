//! Insight error taxonomy.

use thiserror::Error;

use conveyor_core::StoreError;

/// Error surfaced by the remote analyzer adapter.
#[derive(Debug, Error, Clone)]
pub enum AnalyzerError {
    /// The analyzer could not be reached or timed out.
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),

    /// The analyzer answered with a non-success status.
    #[error("analyzer returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The analyzer's response could not be decoded.
    #[error("failed to decode analyzer response: {0}")]
    Decode(String),
}

/// Errors returned by the insights service.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("invalid job id")]
    InvalidJobId,

    #[error("invalid analysis data: {0}")]
    InvalidAnalysisData(String),

    #[error("insight not found")]
    NotFound,

    #[error("job not found")]
    JobNotFound,

    #[error("payload is not a JSON object: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}
