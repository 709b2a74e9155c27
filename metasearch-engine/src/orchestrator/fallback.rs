//! Tiered fallback policy.
//!
//! A request is served by the first tier that yields at least one merged
//! result:
//!
//! ```text
//! Requested(engine) ──fallback──► Curated ──fallback──► Full
//!                                 (default mode)        ("all" mode)
//! ```
//!
//! Each tier is ranked independently with its own cap. If every attempted
//! tier is reachable but empty, the outcome is an empty success; only when
//! no leg in any tier succeeded is the request a failure.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AggregationError, LegFailure};
use crate::provider::Provider;
use crate::registry::EngineRegistry;
use crate::types::{EngineDescriptor, EngineSelector, MergedResult, Query};

use super::fanout::{FanOutReport, LegOutcome, Orchestrator};
use super::ranking::rank_results;

/// One fallback level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    /// Only the engine the caller named.
    Requested(EngineDescriptor),
    /// The curated subset of the most reliable engines.
    Curated,
    /// Every registered engine.
    Full,
}

impl Tier {
    pub fn label(&self) -> &str {
        match self {
            Self::Requested(descriptor) => &descriptor.name,
            Self::Curated => "curated",
            Self::Full => "all",
        }
    }
}

/// Ordered tiers to attempt for `selector`.
pub fn plan_tiers(selector: &EngineSelector, fallback: bool) -> Vec<Tier> {
    match selector {
        EngineSelector::Named(descriptor) if fallback => vec![
            Tier::Requested(descriptor.clone()),
            Tier::Curated,
            Tier::Full,
        ],
        EngineSelector::Named(descriptor) => vec![Tier::Requested(descriptor.clone())],
        EngineSelector::Default if fallback => vec![Tier::Curated, Tier::Full],
        EngineSelector::Default => vec![Tier::Curated],
        EngineSelector::All => vec![Tier::Full],
    }
}

/// Result of the tier that answered a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierOutcome {
    /// The tier that produced `results` (the last reachable tier when empty).
    pub tier: Tier,
    pub results: Vec<MergedResult>,
    /// Engines whose leg succeeded in `tier`.
    pub working_engines: Vec<EngineDescriptor>,
    /// Failed legs across every attempted tier, one per engine.
    pub failures: Vec<LegFailure>,
}

/// Chooses provider sets and escalates between tiers.
#[derive(Debug, Clone)]
pub struct FallbackController {
    registry: Arc<EngineRegistry>,
    orchestrator: Orchestrator,
    curated_cap: usize,
    full_cap: usize,
}

impl FallbackController {
    pub fn new(
        registry: Arc<EngineRegistry>,
        orchestrator: Orchestrator,
        curated_cap: usize,
        full_cap: usize,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            curated_cap,
            full_cap,
        }
    }

    fn providers_for(&self, tier: &Tier) -> Vec<Arc<dyn Provider>> {
        match tier {
            Tier::Requested(descriptor) => self
                .registry
                .lookup(&descriptor.name)
                .cloned()
                .into_iter()
                .collect(),
            Tier::Curated => self.registry.curated(),
            Tier::Full => self.registry.all(),
        }
    }

    fn cap_for(&self, tier: &Tier) -> Option<usize> {
        match tier {
            Tier::Requested(_) => None,
            Tier::Curated => Some(self.curated_cap),
            Tier::Full => Some(self.full_cap),
        }
    }

    /// Walk the tier plan for `selector` until one tier yields results.
    ///
    /// Each engine is dispatched at most once per request. A later tier that
    /// includes an engine an earlier tier already settled reuses that outcome,
    /// so the breaker sees one success or failure per engine per request.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::AllProvidersUnreachable`] when no leg of
    /// any attempted tier succeeded.
    pub async fn execute(
        &self,
        query: &Query,
        selector: &EngineSelector,
        fallback: bool,
    ) -> Result<TierOutcome, AggregationError> {
        let mut settled: HashMap<String, LegOutcome> = HashMap::new();
        let mut failures: Vec<LegFailure> = Vec::new();
        let mut last_reachable: Option<TierOutcome> = None;

        for tier in plan_tiers(selector, fallback) {
            let providers = self.providers_for(&tier);
            let fresh: Vec<Arc<dyn Provider>> = providers
                .iter()
                .filter(|provider| !settled.contains_key(provider.name()))
                .cloned()
                .collect();
            tracing::debug!(
                tier = tier.label(),
                legs = providers.len(),
                reused = providers.len() - fresh.len(),
                "dispatching tier"
            );

            for (engine, outcome) in self.orchestrator.run_legs(query, &fresh).await {
                if let Err(error) = &outcome {
                    failures.push(LegFailure {
                        engine: engine.clone(),
                        error: error.clone(),
                    });
                }
                settled.insert(engine.name.clone(), outcome);
            }

            let legs = providers.iter().filter_map(|provider| {
                settled
                    .get(provider.name())
                    .map(|outcome| (provider.descriptor().clone(), outcome.clone()))
            });

            match FanOutReport::from_legs(legs) {
                Ok(report) => {
                    let results = rank_results(report.successful_results, self.cap_for(&tier));
                    let outcome = TierOutcome {
                        tier,
                        results,
                        working_engines: report.working_engines,
                        failures: Vec::new(),
                    };
                    if !outcome.results.is_empty() {
                        tracing::debug!(
                            tier = outcome.tier.label(),
                            count = outcome.results.len(),
                            "tier answered"
                        );
                        return Ok(TierOutcome {
                            failures,
                            ..outcome
                        });
                    }
                    tracing::debug!(tier = outcome.tier.label(), "tier returned no results");
                    last_reachable = Some(outcome);
                }
                Err(AggregationError::AllProvidersUnreachable {
                    failures: tier_failures,
                }) => {
                    tracing::debug!(
                        tier = tier.label(),
                        failed = tier_failures.len(),
                        "tier unreachable"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        match last_reachable {
            Some(outcome) => Ok(TierOutcome {
                failures,
                ..outcome
            }),
            None => Err(AggregationError::AllProvidersUnreachable { failures }),
        }
    }
}
