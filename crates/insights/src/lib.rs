//! AI failure analysis: the insight entity, the analyzer port, and the
//! caching client that guarantees a job is analyzed at most once.
//!
//! This crate is a subsystem boundary: it reads jobs and emits insights, but
//! never drives the job lifecycle on its own. The only write path back into
//! a job is the explicitly opt-in [`service::InsightsService::apply_suggested_fix`].

pub mod error;
pub mod insight;
pub mod memory;
pub mod ports;
pub mod service;

pub use error::{AnalyzerError, InsightError};
pub use insight::{AnalysisRequest, AnalysisResponse, Insight, SuggestedFix};
pub use memory::InMemoryInsightRepository;
pub use ports::{AnalyzerService, InsightRepository};
pub use service::InsightsService;
