//! Core value types: queries, engine descriptors, raw and merged results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AggregationError;

/// Reliability rank given to engines missing from the canonical table.
///
/// Sorts after every ranked engine.
pub const UNRANKED: u32 = u32::MAX;

/// An immutable search request as seen by providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    text: String,
    page: u32,
    safe_search: bool,
}

impl Query {
    /// Build a query, rejecting blank text and page 0.
    pub fn new(text: &str, page: u32, safe_search: bool) -> Result<Self, AggregationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AggregationError::Validation(
                "query text must not be empty".into(),
            ));
        }
        if page == 0 {
            return Err(AggregationError::Validation("page must be >= 1".into()));
        }
        Ok(Self {
            text: text.to_owned(),
            page,
            safe_search,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based result page.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn safe_search(&self) -> bool {
        self.safe_search
    }
}

/// Identifies a provider and its static trust position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineDescriptor {
    /// Lowercase engine identifier, e.g. `"bing"`.
    pub name: String,
    /// Lower is more trusted. [`UNRANKED`] for unknown engines.
    pub reliability_rank: u32,
}

impl EngineDescriptor {
    pub fn new(name: impl Into<String>, reliability_rank: u32) -> Self {
        Self {
            name: name.into(),
            reliability_rank,
        }
    }

    /// Descriptor for an engine absent from the reliability table.
    pub fn unranked(name: impl Into<String>) -> Self {
        Self::new(name, UNRANKED)
    }

    pub fn is_ranked(&self) -> bool {
        self.reliability_rank != UNRANKED
    }
}

impl fmt::Display for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A single result exactly as one provider returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    pub title: String,
    pub url: String,
    /// May be empty.
    pub snippet: String,
    /// 1-based position within the provider's own response.
    pub source_rank: u32,
    pub engine: EngineDescriptor,
}

/// A deduplicated result with its final 1-based position in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedResult {
    pub rank: u32,
    #[serde(flatten)]
    pub result: RawResult,
}

/// Which provider set a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSelector {
    /// Curated subset of the most reliable engines.
    Default,
    /// Every registered engine.
    All,
    /// One specific, registered engine.
    Named(EngineDescriptor),
}

impl EngineSelector {
    /// Stable label used in cache keys and history records.
    pub fn label(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::All => "all",
            Self::Named(descriptor) => &descriptor.name,
        }
    }
}

/// Per-request options accepted by the facade.
///
/// Every field is optional; omitted fields fall back to the client's
/// stored preferences (when `client_id` is set) and then to engine
/// configuration defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Engine name, `"all"` or `"default"`.
    pub engine: Option<String>,
    pub page: Option<u32>,
    pub safe: Option<bool>,
    pub client_id: Option<String>,
    /// Whether to escalate to broader tiers when a tier under-delivers.
    pub fallback: Option<bool>,
    /// Final truncation applied after the tier cap.
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = Some(safe);
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
