//! Startup wiring: turns an [`AppConfig`] into a ready [`AggregationEngine`].
//!
//! Call [`initialize`] once at process start. [`build_engine`] is the
//! lower-level entry point for callers that bring their own persistence.

use std::sync::Arc;
use std::time::Instant;

use metasearch_engine::providers::{BingProvider, DuckDuckGoProvider, SearxProvider};
use metasearch_engine::{AggregationEngine, Persistence, Provider, ProviderError};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::storage::open_persistence;

/// Validate `config`, open the configured storage and build the engine.
///
/// # Errors
///
/// Returns an error if the config is invalid, storage cannot be opened,
/// or a provider cannot be constructed.
pub fn initialize(config: &AppConfig) -> Result<AggregationEngine> {
    let started = Instant::now();
    config.validate()?;
    let persistence = open_persistence(&config.storage)?;
    let engine = build_engine(config, Some(persistence))?;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "startup complete"
    );
    Ok(engine)
}

/// Register the providers enabled in `[providers]` and build the engine.
///
/// # Errors
///
/// Returns [`AppError::Config`] if a provider cannot be constructed (for
/// example an unusable `searx_url`) and [`AppError::Engine`] if the engine
/// configuration is rejected.
pub fn build_engine(
    config: &AppConfig,
    persistence: Option<Arc<dyn Persistence>>,
) -> Result<AggregationEngine> {
    let mut builder = AggregationEngine::builder(config.engine.clone());
    for provider in enabled_providers(config)? {
        builder = builder.provider(provider);
    }
    if let Some(persistence) = persistence {
        builder = builder.persistence(persistence);
    }
    Ok(builder.build()?)
}

fn enabled_providers(config: &AppConfig) -> Result<Vec<Arc<dyn Provider>>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
    if config.providers.duckduckgo {
        providers.push(Arc::new(
            DuckDuckGoProvider::new(&config.http).map_err(provider_error)?,
        ));
    }
    if config.providers.bing {
        providers.push(Arc::new(
            BingProvider::new(&config.http).map_err(provider_error)?,
        ));
    }
    if let Some(url) = &config.providers.searx_url {
        providers.push(Arc::new(
            SearxProvider::new(url, &config.http).map_err(provider_error)?,
        ));
    }
    let names: Vec<&str> = providers.iter().map(|p| p.descriptor().name.as_str()).collect();
    info!(providers = ?names, "providers enabled");
    Ok(providers)
}

fn provider_error(err: ProviderError) -> AppError {
    AppError::Config(format!("provider setup failed: {err}"))
}
