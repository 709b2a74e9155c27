//! Persistence contract for search history and per-client preferences.
//!
//! The engine only calls into [`Persistence`]; durable storage lives in
//! the host application. History writes are best-effort: failures are
//! logged and never affect a search response.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default number of results a client sees per page.
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 10;

/// Errors from a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The stored or supplied data is invalid.
    #[error("invalid data: {0}")]
    Invalid(String),
}

/// One logged search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub page: u32,
    pub safe_search: bool,
    pub result_count: usize,
    /// Tier or engine label that produced the response.
    pub engine_used: String,
    pub client_id: Option<String>,
    pub served_from_cache: bool,
}

/// Stored per-client search defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Engine name, `"default"` or `"all"`.
    pub default_engine: String,
    pub results_per_page: u32,
    pub safe_search: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_engine: "default".into(),
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            safe_search: true,
        }
    }
}

impl Preferences {
    /// Overlay every field `patch` sets.
    pub fn apply(&mut self, patch: &PreferencesPatch) {
        if let Some(engine) = &patch.default_engine {
            self.default_engine = engine.trim().to_lowercase();
        }
        if let Some(per_page) = patch.results_per_page {
            self.results_per_page = per_page;
        }
        if let Some(safe) = patch.safe_search {
            self.safe_search = safe;
        }
    }
}

/// Partial update to [`Preferences`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesPatch {
    pub default_engine: Option<String>,
    pub results_per_page: Option<u32>,
    pub safe_search: Option<bool>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.default_engine.is_none() && self.results_per_page.is_none() && self.safe_search.is_none()
    }
}

/// Store consulted by the aggregation engine.
///
/// Implementations must be safe to call from concurrent requests.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Append one history record.
    async fn record_history(&self, entry: HistoryEntry) -> Result<(), PersistenceError>;

    /// Stored preferences for `client_id`, or [`Preferences::default`] when none exist.
    async fn get_preferences(&self, client_id: &str) -> Result<Preferences, PersistenceError>;

    /// Merge `patch` into the client's preferences and return the result.
    async fn update_preferences(
        &self,
        client_id: &str,
        patch: PreferencesPatch,
    ) -> Result<Preferences, PersistenceError>;
}

/// Process-local [`Persistence`] backed by plain collections.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    history: Mutex<Vec<HistoryEntry>>,
    preferences: Mutex<HashMap<String, Preferences>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded history entry, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.history).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn record_history(&self, entry: HistoryEntry) -> Result<(), PersistenceError> {
        lock(&self.history).push(entry);
        Ok(())
    }

    async fn get_preferences(&self, client_id: &str) -> Result<Preferences, PersistenceError> {
        Ok(lock(&self.preferences)
            .get(client_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_preferences(
        &self,
        client_id: &str,
        patch: PreferencesPatch,
    ) -> Result<Preferences, PersistenceError> {
        let mut preferences = lock(&self.preferences);
        let entry = preferences.entry(client_id.to_owned()).or_default();
        entry.apply(&patch);
        Ok(entry.clone())
    }
}
