//! Trait definition for pluggable result providers.
//!
//! Each search backend (HTML scrapers, JSON APIs, or anything a host
//! application supplies) implements [`Provider`] so the orchestrator can
//! fan a query out without knowing how results are obtained.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{EngineDescriptor, Query, RawResult};

/// A pluggable result source.
///
/// Implementors must be `Send + Sync`: the same provider serves concurrent
/// queries from independent requests. The orchestrator invokes a provider
/// at most once per fan-out leg.
///
/// A provider that finds nothing returns `Ok(vec![])`. Errors are reserved
/// for being unable to complete the request at all.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identity and reliability rank of this provider.
    fn descriptor(&self) -> &EngineDescriptor;

    /// Run `query` and return results in the provider's own order.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request cannot be completed, the
    /// response cannot be parsed, or the provider does not support the
    /// request.
    async fn search(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
