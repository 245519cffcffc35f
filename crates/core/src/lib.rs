//! Shared kernel for the conveyor job queue: typed identifiers and the
//! domain error model used across crates.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, StoreError};
pub use id::{InsightId, JobId};
