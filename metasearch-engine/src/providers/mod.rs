//! Bundled [`Provider`](crate::provider::Provider) implementations.
//!
//! Each provider stamps `source_rank` 1..N in the order its upstream
//! returned results and maps failures onto
//! [`ProviderError`](crate::error::ProviderError). Host applications can
//! register their own providers next to these.

pub mod bing;
pub mod duckduckgo;
pub mod searx;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use searx::SearxProvider;
