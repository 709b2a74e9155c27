//! # metasearch-engine
//!
//! Aggregates results from several independent, unreliable search
//! providers into one deduplicated, ranked result list.
//!
//! ## Design
//!
//! - Fans a query out to a provider set concurrently; every leg settles
//!   (success, failure or its own timeout) before anything is merged
//! - Deduplicates by normalised URL and title, first occurrence wins
//! - Ranks by snippet quality, then static engine reliability, then the
//!   provider's own position
//! - Falls back from a requested engine to a curated subset to every
//!   registered engine when a tier comes back empty or unreachable
//! - Caches merged results for five minutes and logs every request,
//!   including cache hits, to a pluggable [`Persistence`] store
//! - Trips a per-engine circuit breaker after repeated failures
//!
//! ## Security
//!
//! - No network listeners; this is a library
//! - Search queries are logged only at trace level
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> metasearch_engine::Result<()> {
//! use std::sync::Arc;
//! use metasearch_engine::{AggregationEngine, EngineConfig, HttpConfig, SearchOptions};
//! use metasearch_engine::providers::BingProvider;
//!
//! let bing = BingProvider::new(&HttpConfig::default())
//!     .map_err(|e| metasearch_engine::AggregationError::Config(e.to_string()))?;
//! let engine = AggregationEngine::builder(EngineConfig::default())
//!     .provider(Arc::new(bing))
//!     .build()?;
//! for result in engine.search("rust programming", &SearchOptions::default()).await? {
//!     println!("{}. {} ({})", result.rank, result.result.title, result.result.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod persistence;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;

pub use aggregator::{AggregationEngine, AggregationEngineBuilder, SearchResponse};
pub use circuit_breaker::{CircuitBreakerConfig, CircuitState, EngineHealthReport};
pub use config::{EngineConfig, HttpConfig};
pub use error::{AggregationError, LegFailure, ProviderError, ProviderErrorKind, Result};
pub use persistence::{
    HistoryEntry, MemoryPersistence, Persistence, PersistenceError, Preferences, PreferencesPatch,
};
pub use provider::Provider;
pub use registry::{descriptor_for, EngineRegistry, CANONICAL_ENGINES};
pub use types::{EngineDescriptor, EngineSelector, MergedResult, Query, RawResult, SearchOptions};
