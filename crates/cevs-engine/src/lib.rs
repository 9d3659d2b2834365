//! CEVS aggregation engine. Orchestrates the source providers, normalizes
//! their rows into canonical records, and computes the weighted score with
//! graceful degradation when upstreams fail.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;

pub use aggregator::{CevsAggregator, ListFilters};
pub use cache::ResultCache;
pub use config::{EngineConfig, PollutionSource, SourceConfigs};
pub use error::EngineError;
