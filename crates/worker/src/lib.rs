//! Worker runtime: drains the dispatch channel and drives each job through
//! the lifecycle state machine, with bounded retries, exponential backoff,
//! dead-lettering, and a fire-and-forget analysis hook on first failure.

pub mod backoff;
pub mod config;
pub mod executor;
pub mod service;

pub use backoff::backoff_delay;
pub use config::{WorkerConfig, WorkerConfigError};
pub use executor::{ExecutionResult, Executor};
pub use service::{WorkerError, WorkerService};
