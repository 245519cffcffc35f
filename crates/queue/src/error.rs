//! Queue error taxonomy.

use thiserror::Error;

use conveyor_core::StoreError;

/// Error surfaced by the dispatch channel (volatile queue transport).
#[derive(Debug, Error, Clone)]
pub enum ChannelError {
    /// The broker could not be reached.
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// A broker command failed.
    #[error("channel command failed: {0}")]
    Command(String),

    /// An envelope could not be (de)serialized.
    #[error("envelope serialization error: {0}")]
    Serialization(String),
}

/// Errors returned by the control service and the job entity.
///
/// Validation variants are deterministic and map to 4xx at the HTTP edge;
/// `Store`/`Channel` wrap transient infrastructure failures and map to 5xx.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue name is required")]
    InvalidQueue,

    #[error("job type is required")]
    InvalidType,

    #[error("invalid job status: {0}")]
    InvalidStatus(String),

    #[error("job not found")]
    NotFound,

    #[error("maximum retry attempts reached")]
    MaxAttemptsReached,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
