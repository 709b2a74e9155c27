//! Per-engine circuit breaker for fan-out legs.
//!
//! Tracks consecutive failures per engine and temporarily stops invoking
//! engines that fail repeatedly. After a cooldown period, a tripped engine
//! enters a half-open state where a single probe leg determines whether
//! to restore or re-trip the circuit.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure             │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Circuit state for a single engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Engine is healthy and legs are dispatched.
    Closed,
    /// Engine failed too often; legs settle as failures without a call.
    Open,
    /// Cooldown elapsed; the next leg is a probe.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct EngineHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for EngineHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// One row of [`CircuitBreaker::health_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineHealthReport {
    pub engine: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

/// Configuration for circuit breaker behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// When false every leg is dispatched regardless of history.
    pub enabled: bool,
    /// Number of consecutive failures before tripping the circuit to Open.
    pub failure_threshold: u32,
    /// Seconds to wait in Open state before transitioning to HalfOpen.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

/// Per-engine circuit breaker owned by one aggregation engine.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    engines: HashMap<String, EngineHealth>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            engines: HashMap::new(),
        }
    }

    /// Record a settled successful leg. Restores the engine to Closed.
    pub fn record_success(&mut self, engine: &str) {
        let health = self.engines.entry(engine.to_owned()).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    /// Record a settled failed leg, tripping the circuit at the threshold.
    ///
    /// A disabled breaker still counts failures but never leaves Closed.
    pub fn record_failure(&mut self, engine: &str) {
        let enabled = self.config.enabled;
        let threshold = self.config.failure_threshold;
        let health = self.engines.entry(engine.to_owned()).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_failure_at = Some(Instant::now());

        if !enabled {
            return;
        }
        if health.state == CircuitState::HalfOpen || health.consecutive_failures >= threshold {
            health.state = CircuitState::Open;
        }
    }

    /// Whether a leg for `engine` should be dispatched.
    ///
    /// An Open circuit whose cooldown has elapsed moves to HalfOpen and
    /// lets the leg through as a probe.
    pub fn should_attempt(&mut self, engine: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let Some(health) = self.engines.get_mut(engine) else {
            return true;
        };

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooldown_elapsed = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed() >= cooldown);
                if cooldown_elapsed {
                    health.state = CircuitState::HalfOpen;
                }
                cooldown_elapsed
            }
        }
    }

    pub fn engine_status(&self, engine: &str) -> CircuitState {
        self.engines
            .get(engine)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Health of every engine the breaker has seen, sorted by name.
    pub fn health_report(&self) -> Vec<EngineHealthReport> {
        let mut report: Vec<EngineHealthReport> = self
            .engines
            .iter()
            .map(|(engine, health)| EngineHealthReport {
                engine: engine.clone(),
                state: health.state,
                consecutive_failures: health.consecutive_failures,
            })
            .collect();
        report.sort_by(|a, b| a.engine.cmp(&b.engine));
        report
    }

    pub fn reset(&mut self) {
        self.engines.clear();
    }
}
