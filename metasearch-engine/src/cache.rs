//! In-memory TTL cache for merged result sets.
//!
//! Keyed by (method, normalised query text, page, safe-search). Uses
//! [`moka`] for bounded, async-friendly storage and eviction; each entry
//! also carries its own expiry instant so an entry is never served at or
//! after `inserted_at + ttl`, independent of moka's housekeeping.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::time::Instant;

use crate::orchestrator::ranking::normalize_text;
use crate::types::{MergedResult, Query};

/// Default time-to-live for cached result sets.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Deterministic composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Tier or engine label the request asked for.
    method: String,
    /// Lowercased, whitespace-collapsed query text.
    query: String,
    page: u32,
    safe_search: bool,
}

impl CacheKey {
    pub fn new(method: &str, query: &Query) -> Self {
        Self {
            method: method.to_lowercase(),
            query: normalize_text(query.text()),
            page: query.page(),
            safe_search: query.safe_search(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.method, self.query, self.page, self.safe_search
        )
    }
}

/// A merged result set plus the tier label that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSearch {
    pub results: Vec<MergedResult>,
    /// Label of the answering tier (`curated`, `all` or an engine name).
    pub tier: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<CachedSearch>,
    expires_at: Instant,
}

/// Bounded TTL cache owned by one aggregation engine.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Option<Cache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` result sets for `ttl`.
    ///
    /// A zero `ttl` disables caching: `get` always misses and `set` is a no-op.
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let entries = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { entries, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored value for `key`, if present and unexpired.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedSearch> {
        let entries = self.entries.as_ref()?;
        let entry = entries.get(key).await?;
        if Instant::now() >= entry.expires_at {
            entries.invalidate(key).await;
            return None;
        }
        Some(entry.value.as_ref().clone())
    }

    /// Store `value` under `key` for one TTL from now.
    pub async fn set(&self, key: CacheKey, value: CachedSearch) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + self.ttl,
        };
        entries.insert(key, entry).await;
    }

    /// Evict every entry unconditionally.
    pub fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            entries.invalidate_all();
        }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.as_ref().map_or(0, |c| c.entry_count())
    }
}
