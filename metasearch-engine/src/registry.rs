//! Explicit engine registry built at startup.
//!
//! Holds the canonical reliability table and the set of registered
//! providers. Passed to the fallback controller instead of living in
//! process-wide state.

use std::sync::Arc;

use crate::error::AggregationError;
use crate::provider::Provider;
use crate::types::EngineDescriptor;

/// Canonical engine reliability table. Lower rank = more trusted.
pub const CANONICAL_ENGINES: &[(&str, u32)] = &[
    ("bing", 1),
    ("searx", 2),
    ("ecosia", 3),
    ("duckduckgo", 4),
    ("brave", 5),
    ("startpage", 6),
    ("qwant", 7),
    ("mojeek", 8),
    ("google", 9),
    ("yahoo", 10),
];

/// Canonical descriptor for `name`, or an unranked one if the table lacks it.
pub fn descriptor_for(name: &str) -> EngineDescriptor {
    let name = name.trim().to_lowercase();
    CANONICAL_ENGINES
        .iter()
        .find(|(known, _)| *known == name)
        .map_or_else(
            || EngineDescriptor::unranked(name.clone()),
            |(known, rank)| EngineDescriptor::new(*known, *rank),
        )
}

/// The set of providers available to one aggregation engine.
#[derive(Clone)]
pub struct EngineRegistry {
    providers: Vec<Arc<dyn Provider>>,
    curated: Vec<String>,
}

impl EngineRegistry {
    /// Empty registry whose curated tier uses `curated` (in dispatch order).
    pub fn new<I, S>(curated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            providers: Vec::new(),
            curated: curated
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Register a provider.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Config`] if a provider with the same
    /// name is already registered.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<(), AggregationError> {
        if self.lookup(provider.name()).is_some() {
            return Err(AggregationError::Config(format!(
                "engine registered twice: {}",
                provider.name()
            )));
        }
        tracing::debug!(engine = provider.name(), "provider registered");
        self.providers.push(provider);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Result<Self, AggregationError> {
        self.register(provider)?;
        Ok(self)
    }

    /// Case-insensitive lookup by engine name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        let name = name.trim();
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Descriptors of every registered engine, most reliable first.
    pub fn descriptors(&self) -> Vec<EngineDescriptor> {
        self.all()
            .iter()
            .map(|p| p.descriptor().clone())
            .collect()
    }

    /// Curated providers in configured order, skipping unregistered names.
    pub fn curated(&self) -> Vec<Arc<dyn Provider>> {
        self.curated
            .iter()
            .filter_map(|name| {
                let provider = self.lookup(name);
                if provider.is_none() {
                    tracing::trace!(engine = %name, "curated engine not registered");
                }
                provider.cloned()
            })
            .collect()
    }

    /// Every registered provider ordered by reliability rank, then name.
    pub fn all(&self) -> Vec<Arc<dyn Provider>> {
        let mut all = self.providers.clone();
        all.sort_by(|a, b| {
            let (a, b) = (a.descriptor(), b.descriptor());
            a.reliability_rank
                .cmp(&b.reliability_rank)
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("curated", &self.curated)
            .finish()
    }
}
