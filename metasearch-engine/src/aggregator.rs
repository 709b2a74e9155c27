//! The aggregation engine facade.
//!
//! Composes the registry, fallback controller, fan-out orchestrator,
//! result cache, circuit breaker and persistence into the operations a
//! transport layer calls.
//!
//! ```text
//! CacheCheck ──hit──────────────────────────────► Persist ─► Done
//!     │
//!    miss ─► Dispatch(tier) ─► Merge ─► Cache ─► Persist ─► Done
//!                │
//!                └─ every tier unreachable ─► Failed
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{CacheKey, CachedSearch, ResultCache};
use crate::circuit_breaker::{CircuitBreaker, EngineHealthReport};
use crate::config::EngineConfig;
use crate::error::{AggregationError, LegFailure};
use crate::orchestrator::{FallbackController, Orchestrator};
use crate::persistence::{HistoryEntry, Persistence, Preferences, PreferencesPatch};
use crate::provider::Provider;
use crate::registry::EngineRegistry;
use crate::types::{EngineDescriptor, EngineSelector, MergedResult, Query, SearchOptions};

/// Everything known about how one request was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    /// Ranked results; ranks are dense from 1.
    pub results: Vec<MergedResult>,
    /// Label of the tier that answered (`"curated"`, `"all"` or an engine
    /// name). A cache hit reports the tier that produced the cached entry.
    pub tier: String,
    /// Engines whose leg succeeded in the answering tier. Empty on a cache hit.
    pub working_engines: Vec<EngineDescriptor>,
    /// Failed legs across every attempted tier. Empty on a cache hit.
    pub failures: Vec<LegFailure>,
    pub from_cache: bool,
}

/// Assembles an [`AggregationEngine`].
pub struct AggregationEngineBuilder {
    config: EngineConfig,
    providers: Vec<Arc<dyn Provider>>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl AggregationEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
            persistence: None,
        }
    }

    /// Register a provider. Duplicate names are rejected by [`build`](Self::build).
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Store used for history and per-client preferences.
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// # Errors
    ///
    /// Returns [`AggregationError::Config`] if the configuration is invalid
    /// or two providers share a name.
    pub fn build(self) -> Result<AggregationEngine, AggregationError> {
        self.config.validate()?;

        let mut registry = EngineRegistry::new(&self.config.curated_engines);
        for provider in self.providers {
            registry.register(provider)?;
        }
        if registry.is_empty() {
            tracing::warn!("aggregation engine built without providers; every search will fail");
        }
        let registry = Arc::new(registry);

        let breaker = Arc::new(Mutex::new(CircuitBreaker::new(
            self.config.circuit_breaker.clone(),
        )));
        let orchestrator = Orchestrator::new(self.config.leg_timeout(), Arc::clone(&breaker));
        let controller = FallbackController::new(
            Arc::clone(&registry),
            orchestrator,
            self.config.curated_cap,
            self.config.full_cap,
        );
        let cache = ResultCache::new(self.config.cache_ttl(), self.config.cache_capacity);

        tracing::info!(
            engines = registry.descriptors().len(),
            curated = ?self.config.curated_engines,
            cache_ttl_s = self.config.cache_ttl_seconds,
            "aggregation engine ready"
        );

        Ok(AggregationEngine {
            config: self.config,
            registry,
            controller,
            cache,
            breaker,
            persistence: self.persistence,
        })
    }
}

/// Entry point for transport layers.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct AggregationEngine {
    config: EngineConfig,
    registry: Arc<EngineRegistry>,
    controller: FallbackController,
    cache: ResultCache,
    breaker: Arc<Mutex<CircuitBreaker>>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl AggregationEngine {
    pub fn builder(config: EngineConfig) -> AggregationEngineBuilder {
        AggregationEngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Merged results for `text`.
    ///
    /// # Errors
    ///
    /// Same as [`search_detailed`](Self::search_detailed).
    pub async fn search(
        &self,
        text: &str,
        options: &SearchOptions,
    ) -> Result<Vec<MergedResult>, AggregationError> {
        Ok(self.search_detailed(text, options).await?.results)
    }

    /// Run a search and report how it was answered.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::Validation`] for blank text, an unknown engine,
    ///   or an out-of-range page or limit. No provider is called.
    /// - [`AggregationError::AllProvidersUnreachable`] when no leg of any
    ///   attempted tier succeeded.
    ///
    /// An empty result list with at least one reachable provider is a
    /// success.
    pub async fn search_detailed(
        &self,
        text: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, AggregationError> {
        let client_id = normalize_client_id(options.client_id.as_deref())?;
        let stored = self.stored_preferences(client_id.as_deref(), options).await;

        let selector = match (&options.engine, &stored) {
            (Some(engine), _) => self.resolve_selector(engine)?,
            (None, Some(prefs)) => self
                .resolve_selector(&prefs.default_engine)
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "stored default engine ignored");
                    EngineSelector::Default
                }),
            (None, None) => EngineSelector::Default,
        };

        let page = options.page.unwrap_or(1);
        if page > self.config.max_page {
            return Err(AggregationError::Validation(format!(
                "page must be between 1 and {}",
                self.config.max_page
            )));
        }
        let safe = options
            .safe
            .or(stored.as_ref().map(|p| p.safe_search))
            .unwrap_or(self.config.safe_search_by_default);
        let query = Query::new(text, page, safe)?;

        let limit = options.limit;
        if let Some(limit) = limit {
            self.check_limit(limit)?;
        }
        let fallback = options.fallback.unwrap_or(self.config.fallback_by_default);

        tracing::trace!(query = query.text(), page, safe, "search requested");

        let key = CacheKey::new(&cache_method(&selector, fallback), &query);
        if let Some(cached) = self.cache.get(&key).await {
            let CachedSearch { mut results, tier } = cached;
            tracing::debug!(
                method = selector.label(),
                tier = %tier,
                count = results.len(),
                "cache hit"
            );
            apply_limit(&mut results, limit);
            self.record_history(&query, &results, &tier, client_id, true);
            return Ok(SearchResponse {
                results,
                tier,
                working_engines: Vec::new(),
                failures: Vec::new(),
                from_cache: true,
            });
        }

        let outcome = match self.controller.execute(&query, &selector, fallback).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(method = selector.label(), error = %err, "search failed");
                return Err(err);
            }
        };

        let tier = outcome.tier.label().to_owned();
        self.cache
            .set(
                key,
                CachedSearch {
                    results: outcome.results.clone(),
                    tier: tier.clone(),
                },
            )
            .await;

        let mut results = outcome.results;
        apply_limit(&mut results, limit);
        tracing::debug!(
            tier = %tier,
            count = results.len(),
            working = outcome.working_engines.len(),
            failed = outcome.failures.len(),
            "search answered"
        );
        self.record_history(&query, &results, &tier, client_id, false);

        Ok(SearchResponse {
            results,
            tier,
            working_engines: outcome.working_engines,
            failures: outcome.failures,
            from_cache: false,
        })
    }

    /// Evict every cached result set.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("result cache cleared");
    }

    /// Every registered engine, most reliable first.
    pub fn list_engines(&self) -> Vec<EngineDescriptor> {
        self.registry.descriptors()
    }

    /// Circuit state of every engine that has reported at least once.
    pub fn engine_health(&self) -> Vec<EngineHealthReport> {
        self.breaker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .health_report()
    }

    /// Stored preferences for `client_id`, or defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Validation`] for a blank client id and
    /// [`AggregationError::Persistence`] if the store fails.
    pub async fn preferences(&self, client_id: &str) -> Result<Preferences, AggregationError> {
        let client_id = require_client_id(client_id)?;
        match &self.persistence {
            Some(store) => Ok(store.get_preferences(&client_id).await?),
            None => Ok(Preferences::default()),
        }
    }

    /// Merge `patch` into the client's preferences.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Validation`] if the patch names an unknown
    /// engine or an out-of-range results-per-page value,
    /// [`AggregationError::Config`] when no store is configured, and
    /// [`AggregationError::Persistence`] if the store fails.
    pub async fn update_preferences(
        &self,
        client_id: &str,
        patch: PreferencesPatch,
    ) -> Result<Preferences, AggregationError> {
        let client_id = require_client_id(client_id)?;
        if let Some(engine) = &patch.default_engine {
            self.resolve_selector(engine)?;
        }
        if let Some(per_page) = patch.results_per_page {
            self.check_limit(per_page as usize)?;
        }
        let Some(store) = &self.persistence else {
            return Err(AggregationError::Config(
                "no preference store configured".into(),
            ));
        };
        let updated = store.update_preferences(&client_id, patch).await?;
        tracing::debug!(client_id = %client_id, engine = %updated.default_engine, "preferences updated");
        Ok(updated)
    }

    fn resolve_selector(&self, engine: &str) -> Result<EngineSelector, AggregationError> {
        let engine = engine.trim();
        if engine.is_empty() || engine.eq_ignore_ascii_case("default") {
            return Ok(EngineSelector::Default);
        }
        if engine.eq_ignore_ascii_case("all") {
            return Ok(EngineSelector::All);
        }
        self.registry
            .lookup(engine)
            .map(|provider| EngineSelector::Named(provider.descriptor().clone()))
            .ok_or_else(|| AggregationError::Validation(format!("unknown engine: {engine}")))
    }

    fn check_limit(&self, limit: usize) -> Result<(), AggregationError> {
        if limit == 0 || limit > self.config.max_limit {
            return Err(AggregationError::Validation(format!(
                "limit must be between 1 and {}",
                self.config.max_limit
            )));
        }
        Ok(())
    }

    /// Preferences to fill in omitted options, when a client is identified.
    async fn stored_preferences(
        &self,
        client_id: Option<&str>,
        options: &SearchOptions,
    ) -> Option<Preferences> {
        if options.engine.is_some() && options.safe.is_some() {
            return None;
        }
        let store = self.persistence.as_ref()?;
        let client_id = client_id?;
        match store.get_preferences(client_id).await {
            Ok(prefs) => Some(prefs),
            Err(err) => {
                tracing::warn!(client_id, error = %err, "preferences unavailable; using defaults");
                None
            }
        }
    }

    /// Fire-and-forget history write. Failures are logged only.
    fn record_history(
        &self,
        query: &Query,
        results: &[MergedResult],
        engine_used: &str,
        client_id: Option<String>,
        served_from_cache: bool,
    ) {
        let Some(store) = self.persistence.clone() else {
            return;
        };
        let entry = HistoryEntry {
            query: query.text().to_owned(),
            page: query.page(),
            safe_search: query.safe_search(),
            result_count: results.len(),
            engine_used: engine_used.to_owned(),
            client_id,
            served_from_cache,
        };
        tokio::spawn(async move {
            if let Err(err) = store.record_history(entry).await {
                tracing::warn!(error = %err, "failed to record search history");
            }
        });
    }
}

impl std::fmt::Debug for AggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationEngine")
            .field("registry", &self.registry)
            .field("cache_entries", &self.cache.entry_count())
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}

/// Cache method component. Disabling fallback changes what a selector
/// can return, so it gets its own key space.
fn cache_method(selector: &EngineSelector, fallback: bool) -> String {
    match selector {
        EngineSelector::All => selector.label().to_owned(),
        _ if fallback => selector.label().to_owned(),
        _ => format!("{}/nofallback", selector.label()),
    }
}

/// Truncate after the tier cap; ranks stay dense because the prefix of a
/// dense 1..N sequence is dense.
fn apply_limit(results: &mut Vec<MergedResult>, limit: Option<usize>) {
    if let Some(limit) = limit {
        results.truncate(limit);
    }
}

fn normalize_client_id(client_id: Option<&str>) -> Result<Option<String>, AggregationError> {
    client_id.map(require_client_id).transpose()
}

fn require_client_id(client_id: &str) -> Result<String, AggregationError> {
    let client_id = client_id.trim();
    if client_id.is_empty() {
        return Err(AggregationError::Validation(
            "client_id must not be empty".into(),
        ));
    }
    Ok(client_id.to_owned())
}
