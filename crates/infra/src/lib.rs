//! Infrastructure adapters: Postgres metadata store, Redis dispatch channel,
//! analyzer HTTP client, configuration loading, and the reference executor.

pub mod analyzer;
pub mod config;
pub mod executor;
pub mod postgres;
pub mod redis;

pub use self::analyzer::AnalyzerHttpClient;
pub use self::config::Settings;
pub use self::executor::SimulatedExecutor;
pub use self::postgres::{PostgresInsightRepository, PostgresJobRepository};
pub use self::redis::RedisDispatchChannel;
