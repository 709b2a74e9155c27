//! Routes host commands to the aggregation engine.

use std::sync::Arc;
use std::time::Instant;

use metasearch_engine::{
    AggregationEngine, AggregationError, LegFailure, PreferencesPatch, SearchOptions,
    SearchResponse,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::host::contract::{
    CommandEnvelope, CommandName, ContractError, ContractErrorKind, ResponseEnvelope,
};

/// Payload of `search.run`.
#[derive(Debug, Deserialize)]
struct SearchRunPayload {
    query: String,
    #[serde(flatten)]
    options: SearchOptions,
}

/// Payload of `preferences.get`.
#[derive(Debug, Deserialize)]
struct ClientPayload {
    client_id: String,
}

/// Payload of `preferences.update`.
#[derive(Debug, Deserialize)]
struct PreferencesUpdatePayload {
    client_id: String,
    #[serde(flatten)]
    patch: PreferencesPatch,
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Engine(#[from] AggregationError),
}

impl CommandError {
    /// Stable machine-readable category for error payloads.
    fn kind(&self) -> &'static str {
        match self {
            Self::Contract(err) => match err.kind {
                ContractErrorKind::UnsupportedVersion => "unsupported_version",
                ContractErrorKind::InvalidEnvelope => "invalid_envelope",
                ContractErrorKind::InvalidPayload => "invalid_payload",
            },
            Self::Engine(err) => match err {
                AggregationError::AllProvidersUnreachable { .. } => "unreachable",
                AggregationError::Validation(_) => "validation",
                AggregationError::Config(_) => "config",
                AggregationError::Persistence(_) => "storage",
            },
        }
    }

    fn payload(&self) -> Value {
        let mut payload = json!({ "kind": self.kind() });
        if let Self::Engine(AggregationError::AllProvidersUnreachable { failures }) = self {
            payload["failures"] = failures_json(failures);
        }
        payload
    }
}

/// Executes [`CommandEnvelope`]s against a shared [`AggregationEngine`].
#[derive(Clone)]
pub struct CommandHandler {
    engine: Arc<AggregationEngine>,
}

impl CommandHandler {
    #[must_use]
    pub fn new(engine: Arc<AggregationEngine>) -> Self {
        Self { engine }
    }

    /// Execute one command and build its response. Never fails; errors are
    /// reported in the envelope.
    pub async fn route(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        let started = Instant::now();
        let result = match envelope.validate() {
            Ok(()) => self.dispatch(envelope).await,
            Err(err) => Err(err.into()),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(payload) => {
                debug!(
                    command = envelope.command.as_str(),
                    request_id = %envelope.request_id,
                    elapsed_ms,
                    "command handled"
                );
                ResponseEnvelope::ok(envelope.request_id.clone(), payload)
            }
            Err(err) => {
                warn!(
                    command = envelope.command.as_str(),
                    request_id = %envelope.request_id,
                    elapsed_ms,
                    error = %err,
                    "command failed"
                );
                let mut response = ResponseEnvelope::error(envelope.request_id.clone(), err.to_string());
                response.payload = err.payload();
                response
            }
        }
    }

    async fn dispatch(&self, envelope: &CommandEnvelope) -> Result<Value, CommandError> {
        match envelope.command {
            CommandName::HostPing => Ok(json!({
                "pong": true,
                "version": env!("CARGO_PKG_VERSION"),
            })),
            CommandName::SearchRun => {
                let payload: SearchRunPayload = parse_payload(envelope)?;
                let response = self
                    .engine
                    .search_detailed(&payload.query, &payload.options)
                    .await?;
                Ok(search_response_json(&response))
            }
            CommandName::CacheClear => {
                self.engine.clear_cache();
                Ok(json!({ "cleared": true }))
            }
            CommandName::EnginesList => Ok(json!({ "engines": self.engine.list_engines() })),
            CommandName::EnginesHealth => Ok(json!({ "engines": self.engine.engine_health() })),
            CommandName::PreferencesGet => {
                let payload: ClientPayload = parse_payload(envelope)?;
                let prefs = self.engine.preferences(&payload.client_id).await?;
                Ok(json!({ "client_id": payload.client_id, "preferences": prefs }))
            }
            CommandName::PreferencesUpdate => {
                let payload: PreferencesUpdatePayload = parse_payload(envelope)?;
                if payload.patch.is_empty() {
                    return Err(ContractError::new(
                        ContractErrorKind::InvalidPayload,
                        "preferences.update needs at least one field".to_owned(),
                    )
                    .into());
                }
                let prefs = self
                    .engine
                    .update_preferences(&payload.client_id, payload.patch)
                    .await?;
                Ok(json!({ "client_id": payload.client_id, "preferences": prefs }))
            }
            CommandName::RuntimeStop => Ok(json!({ "stopping": true })),
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

fn parse_payload<T: DeserializeOwned>(envelope: &CommandEnvelope) -> Result<T, ContractError> {
    serde_json::from_value(envelope.payload.clone()).map_err(|e| {
        ContractError::new(
            ContractErrorKind::InvalidPayload,
            format!("invalid {} payload: {e}", envelope.command.as_str()),
        )
    })
}

fn search_response_json(response: &SearchResponse) -> Value {
    json!({
        "results": response.results,
        "tier": response.tier,
        "working_engines": response.working_engines,
        "failures": failures_json(&response.failures),
        "from_cache": response.from_cache,
    })
}

fn failures_json(failures: &[LegFailure]) -> Value {
    failures
        .iter()
        .map(|failure| {
            json!({
                "engine": failure.engine.name,
                "kind": failure.error.kind.as_str(),
                "message": failure.error.message,
            })
        })
        .collect()
}
