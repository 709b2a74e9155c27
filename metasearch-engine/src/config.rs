//! Engine configuration with sensible defaults.
//!
//! [`EngineConfig`] controls tier caps, leg timeouts, caching and the
//! curated engine subset. [`HttpConfig`] controls how the bundled
//! providers talk to upstream search engines.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::AggregationError;

/// Configuration for the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-leg timeout in milliseconds. Each provider call is bounded independently.
    pub leg_timeout_ms: u64,
    /// How long merged results stay cached. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached result sets.
    pub cache_capacity: u64,
    /// Engines queried by the curated tier, in dispatch order.
    pub curated_engines: Vec<String>,
    /// Result cap for the curated tier.
    pub curated_cap: usize,
    /// Result cap for the full-set tier.
    pub full_cap: usize,
    /// Highest page number a caller may request.
    pub max_page: u32,
    /// Highest explicit `limit` (and results-per-page preference) accepted.
    pub max_limit: usize,
    /// Fallback behaviour when a request does not say.
    pub fallback_by_default: bool,
    /// Safe-search behaviour when neither the request nor preferences say.
    pub safe_search_by_default: bool,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leg_timeout_ms: 8_000,
            cache_ttl_seconds: 300,
            cache_capacity: 512,
            curated_engines: vec!["searx".into(), "bing".into(), "ecosia".into()],
            curated_cap: 15,
            full_cap: 20,
            max_page: 50,
            max_limit: 100,
            fallback_by_default: true,
            safe_search_by_default: true,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn leg_timeout(&self) -> Duration {
        Duration::from_millis(self.leg_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.leg_timeout_ms == 0 {
            return Err(AggregationError::Config(
                "leg_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.curated_cap == 0 || self.full_cap == 0 {
            return Err(AggregationError::Config(
                "curated_cap and full_cap must be greater than 0".into(),
            ));
        }
        if self.curated_engines.is_empty() {
            return Err(AggregationError::Config(
                "at least one curated engine must be listed".into(),
            ));
        }
        if self.max_page == 0 {
            return Err(AggregationError::Config(
                "max_page must be greater than 0".into(),
            ));
        }
        if self.max_limit == 0 {
            return Err(AggregationError::Config(
                "max_limit must be greater than 0".into(),
            ));
        }
        if self.cache_ttl_seconds > 0 && self.cache_capacity == 0 {
            return Err(AggregationError::Config(
                "cache_capacity must be greater than 0 when caching is enabled".into(),
            ));
        }
        if self.circuit_breaker.enabled && self.circuit_breaker.failure_threshold == 0 {
            return Err(AggregationError::Config(
                "circuit_breaker.failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP behaviour of the bundled providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 8,
            user_agent: None,
            accept_language: "en-US,en;q=0.9".into(),
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.timeout_seconds == 0 {
            return Err(AggregationError::Config(
                "http timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_policy_values() {
        let config = EngineConfig::default();
        assert_eq!(config.curated_cap, 15);
        assert_eq!(config.full_cap, 20);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.curated_engines, vec!["searx", "bing", "ecosia"]);
        assert!(config.fallback_by_default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_leg_timeout_rejected() {
        let config = EngineConfig {
            leg_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("leg_timeout_ms"));
    }

    #[test]
    fn zero_caps_rejected() {
        let config = EngineConfig {
            full_cap: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_curated_list_rejected() {
        let config = EngineConfig {
            curated_engines: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("curated"));
    }

    #[test]
    fn zero_ttl_disables_cache_without_capacity() {
        let config = EngineConfig {
            cache_ttl_seconds: 0,
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"curated_cap": 5}"#).expect("deserialize");
        assert_eq!(config.curated_cap, 5);
        assert_eq!(config.full_cap, 20);
    }

    #[test]
    fn http_zero_timeout_rejected() {
        let config = HttpConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(HttpConfig::default().validate().is_ok());
    }
}
