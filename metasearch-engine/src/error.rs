//! Error types for the metasearch-engine crate.
//!
//! Provider errors are per-leg and never escape the orchestrator as-is;
//! they are downgraded into [`LegFailure`] entries. Only
//! [`AggregationError`] reaches callers of the facade.

use std::fmt;

use crate::persistence::PersistenceError;
use crate::types::EngineDescriptor;

/// Why a single provider call could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// The leg exceeded its timeout.
    Timeout,
    /// Connection, TLS or HTTP status failure.
    Network,
    /// The provider answered but the payload could not be understood.
    ParseFailure,
    /// The provider cannot serve this kind of request.
    Unsupported,
    /// The engine's circuit breaker is open; the provider was not invoked.
    CircuitOpen,
}

impl ProviderErrorKind {
    /// Returns the stable lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::ParseFailure => "parse",
            Self::Unsupported => "unsupported",
            Self::CircuitOpen => "circuit open",
        }
    }

    /// Whether retrying the same provider later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::ParseFailure)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one provider invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ParseFailure, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unsupported, message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::CircuitOpen, message)
    }
}

/// A fan-out leg that settled as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegFailure {
    pub engine: EngineDescriptor,
    pub error: ProviderError,
}

impl fmt::Display for LegFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.engine.name, self.error)
    }
}

/// Errors surfaced by the aggregation engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// Every leg of every attempted tier failed.
    #[error("all providers unreachable: {}", summarize(.failures))]
    AllProvidersUnreachable { failures: Vec<LegFailure> },

    /// The caller supplied an unknown engine or an out-of-range value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid engine configuration or registry setup.
    #[error("config error: {0}")]
    Config(String),

    /// The preference store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

fn summarize(failures: &[LegFailure]) -> String {
    if failures.is_empty() {
        return "no providers available".to_owned();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience type alias for metasearch-engine results.
pub type Result<T> = std::result::Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_provider_error() {
        let err = ProviderError::timeout("exceeded 8000ms");
        assert_eq!(err.to_string(), "timeout error: exceeded 8000ms");
    }

    #[test]
    fn display_all_providers_unreachable() {
        let err = AggregationError::AllProvidersUnreachable {
            failures: vec![
                LegFailure {
                    engine: EngineDescriptor::new("bing", 1),
                    error: ProviderError::network("connection refused"),
                },
                LegFailure {
                    engine: EngineDescriptor::new("searx", 2),
                    error: ProviderError::parse("unexpected payload"),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "all providers unreachable: bing: network error: connection refused; \
             searx: parse error: unexpected payload"
        );
    }

    #[test]
    fn display_unreachable_without_legs() {
        let err = AggregationError::AllProvidersUnreachable { failures: vec![] };
        assert_eq!(
            err.to_string(),
            "all providers unreachable: no providers available"
        );
    }

    #[test]
    fn display_validation() {
        let err = AggregationError::Validation("unknown engine: altavista".into());
        assert_eq!(err.to_string(), "validation error: unknown engine: altavista");
    }

    #[test]
    fn transient_kinds() {
        assert!(ProviderErrorKind::Timeout.is_transient());
        assert!(ProviderErrorKind::Network.is_transient());
        assert!(!ProviderErrorKind::Unsupported.is_transient());
        assert!(!ProviderErrorKind::CircuitOpen.is_transient());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AggregationError>();
        assert_send_sync::<ProviderError>();
    }
}
