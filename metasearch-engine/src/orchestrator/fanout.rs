//! Concurrent fan-out of one query to a set of providers.
//!
//! Settle-all semantics: every leg runs to success, failure or its own
//! timeout before anything is merged. A failing leg never cancels its
//! siblings.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{AggregationError, LegFailure, ProviderError};
use crate::provider::Provider;
use crate::types::{EngineDescriptor, Query, RawResult};

/// Union of every settled leg of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Results of successful legs, concatenated in submission order.
    pub successful_results: Vec<RawResult>,
    /// Engines whose leg succeeded, in submission order.
    pub working_engines: Vec<EngineDescriptor>,
    /// Engines whose leg failed, in submission order.
    pub failures: Vec<LegFailure>,
}

/// Settled outcome of one provider leg.
pub type LegOutcome = Result<Vec<RawResult>, ProviderError>;

impl FanOutReport {
    /// Fold settled legs into a report, restamping each result with its engine.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::AllProvidersUnreachable`] when no leg succeeded.
    pub fn from_legs(
        legs: impl IntoIterator<Item = (EngineDescriptor, LegOutcome)>,
    ) -> Result<Self, AggregationError> {
        let mut report = Self::default();
        for (descriptor, outcome) in legs {
            match outcome {
                Ok(results) => {
                    report
                        .successful_results
                        .extend(results.into_iter().map(|mut result| {
                            result.engine = descriptor.clone();
                            result
                        }));
                    report.working_engines.push(descriptor);
                }
                Err(error) => report.failures.push(LegFailure {
                    engine: descriptor,
                    error,
                }),
            }
        }

        if report.working_engines.is_empty() {
            return Err(AggregationError::AllProvidersUnreachable {
                failures: report.failures,
            });
        }
        if !report.failures.is_empty() {
            tracing::debug!(
                working = report.working_engines.len(),
                failed = report.failures.len(),
                "partial fan-out"
            );
        }
        Ok(report)
    }
}

/// Runs provider legs concurrently under independent per-leg timeouts.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    leg_timeout: Duration,
    breaker: Arc<Mutex<CircuitBreaker>>,
}

impl Orchestrator {
    pub fn new(leg_timeout: Duration, breaker: Arc<Mutex<CircuitBreaker>>) -> Self {
        Self {
            leg_timeout,
            breaker,
        }
    }

    /// Query every provider in `providers` concurrently and collect the outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::AllProvidersUnreachable`] when no leg
    /// succeeds, including when `providers` is empty. A leg that succeeds
    /// with zero results counts as reachable.
    pub async fn run(
        &self,
        query: &Query,
        providers: &[Arc<dyn Provider>],
    ) -> Result<FanOutReport, AggregationError> {
        FanOutReport::from_legs(self.run_legs(query, providers).await)
    }

    /// Settle one leg per provider, paired with its descriptor in submission order.
    pub async fn run_legs(
        &self,
        query: &Query,
        providers: &[Arc<dyn Provider>],
    ) -> Vec<(EngineDescriptor, LegOutcome)> {
        let legs = providers
            .iter()
            .map(|provider| self.run_leg(query, provider.as_ref()));
        let outcomes = join_all(legs).await;
        providers
            .iter()
            .map(|provider| provider.descriptor().clone())
            .zip(outcomes)
            .collect()
    }

    async fn run_leg(
        &self,
        query: &Query,
        provider: &dyn Provider,
    ) -> LegOutcome {
        let engine = provider.name();

        let allowed = self.breaker().should_attempt(engine);
        if !allowed {
            tracing::info!(engine, "circuit open; leg skipped");
            return Err(ProviderError::circuit_open(format!(
                "{engine} disabled after repeated failures"
            )));
        }

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.leg_timeout, provider.search(query)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::timeout(format!(
                "exceeded {}ms",
                self.leg_timeout.as_millis()
            ))),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        {
            let mut breaker = self.breaker();
            if outcome.is_ok() {
                breaker.record_success(engine);
            } else {
                breaker.record_failure(engine);
            }
        }

        match &outcome {
            Ok(results) => {
                tracing::debug!(engine, count = results.len(), elapsed_ms, "leg succeeded");
            }
            Err(err) if err.kind.is_transient() => {
                tracing::warn!(engine, elapsed_ms, error = %err, "leg failed");
            }
            Err(err) => {
                tracing::info!(engine, elapsed_ms, error = %err, "leg failed");
            }
        }
        outcome
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::error::ProviderErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Results(usize),
        Fail,
        Sleep(Duration),
    }

    struct ScriptedProvider {
        descriptor: EngineDescriptor,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &str, rank: u32, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                descriptor: EngineDescriptor::new(name, rank),
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn descriptor(&self) -> &EngineDescriptor {
            &self.descriptor
        }

        async fn search(&self, _query: &Query) -> Result<Vec<RawResult>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Results(n) => Ok((1..=n as u32)
                    .map(|i| RawResult {
                        title: format!("{} {i}", self.descriptor.name),
                        url: format!("https://{}.example/{i}", self.descriptor.name),
                        snippet: String::new(),
                        source_rank: i,
                        // Deliberately wrong; the orchestrator restamps it.
                        engine: EngineDescriptor::unranked("wrong"),
                    })
                    .collect()),
                Behaviour::Fail => Err(ProviderError::network("connection reset")),
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(d).await;
                    Ok(vec![])
                }
            }
        }
    }

    fn orchestrator(timeout: Duration) -> Orchestrator {
        Orchestrator::new(
            timeout,
            Arc::new(Mutex::new(CircuitBreaker::new(CircuitBreakerConfig::default()))),
        )
    }

    fn query() -> Query {
        Query::new("rust", 1, true).expect("query")
    }

    #[tokio::test(start_paused = true)]
    async fn settle_all_with_partial_failure() {
        let searx = ScriptedProvider::new("searx", 2, Behaviour::Results(3));
        let bing = ScriptedProvider::new("bing", 1, Behaviour::Fail);
        let ecosia = ScriptedProvider::new("ecosia", 3, Behaviour::Sleep(Duration::from_secs(60)));
        let providers: Vec<Arc<dyn Provider>> = vec![searx.clone(), bing.clone(), ecosia.clone()];

        let report = orchestrator(Duration::from_secs(5))
            .run(&query(), &providers)
            .await
            .expect("one leg succeeded");

        assert_eq!(report.successful_results.len(), 3);
        assert!(report.successful_results.iter().all(|r| r.engine.name == "searx"));
        assert_eq!(report.working_engines, vec![EngineDescriptor::new("searx", 2)]);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].engine.name, "bing");
        assert_eq!(report.failures[0].error.kind, ProviderErrorKind::Network);
        assert_eq!(report.failures[1].engine.name, "ecosia");
        assert_eq!(report.failures[1].error.kind, ProviderErrorKind::Timeout);
        assert_eq!(searx.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ecosia.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn legs_keep_submission_order() {
        let bing = ScriptedProvider::new("bing", 1, Behaviour::Results(2));
        let searx = ScriptedProvider::new("searx", 2, Behaviour::Results(1));
        let providers: Vec<Arc<dyn Provider>> = vec![searx, bing];

        let report = orchestrator(Duration::from_secs(5))
            .run(&query(), &providers)
            .await
            .expect("report");

        let engines: Vec<_> = report
            .successful_results
            .iter()
            .map(|r| (r.engine.name.as_str(), r.source_rank))
            .collect();
        assert_eq!(engines, vec![("searx", 1), ("bing", 1), ("bing", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn legs_run_concurrently_under_one_timeout() {
        let slow_a = ScriptedProvider::new("searx", 2, Behaviour::Sleep(Duration::from_secs(3)));
        let slow_b = ScriptedProvider::new("bing", 1, Behaviour::Sleep(Duration::from_secs(3)));
        let providers: Vec<Arc<dyn Provider>> = vec![slow_a, slow_b];

        let started = Instant::now();
        let report = orchestrator(Duration::from_secs(5))
            .run(&query(), &providers)
            .await
            .expect("both legs finish within their timeout");
        assert_eq!(report.working_engines.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_success_is_reachable() {
        let bing = ScriptedProvider::new("bing", 1, Behaviour::Results(0));
        let providers: Vec<Arc<dyn Provider>> = vec![bing];
        let report = orchestrator(Duration::from_secs(5))
            .run(&query(), &providers)
            .await
            .expect("zero results is still a success");
        assert!(report.successful_results.is_empty());
        assert_eq!(report.working_engines.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn all_legs_failing_is_an_error() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            ScriptedProvider::new("bing", 1, Behaviour::Fail),
            ScriptedProvider::new("searx", 2, Behaviour::Sleep(Duration::from_secs(60))),
        ];
        let err = orchestrator(Duration::from_secs(1))
            .run(&query(), &providers)
            .await
            .unwrap_err();
        match err {
            AggregationError::AllProvidersUnreachable { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn no_providers_is_unreachable() {
        let err = orchestrator(Duration::from_secs(1))
            .run(&query(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::AllProvidersUnreachable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_skips_provider() {
        let breaker = Arc::new(Mutex::new(CircuitBreaker::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold: 2,
            cooldown_secs: 600,
        })));
        let orchestrator = Orchestrator::new(Duration::from_secs(1), breaker.clone());
        let bing = ScriptedProvider::new("bing", 1, Behaviour::Fail);
        let providers: Vec<Arc<dyn Provider>> = vec![bing.clone()];

        for _ in 0..3 {
            let _ = orchestrator.run(&query(), &providers).await;
        }

        assert_eq!(bing.calls.load(Ordering::SeqCst), 2);
        let state = breaker.lock().expect("lock").engine_status("bing");
        assert_eq!(state, CircuitState::Open);
    }
}
