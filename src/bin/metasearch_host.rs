//! Headless metasearch host for stdin/stdout JSON communication.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin,
//! runs them against the aggregation engine, and writes `ResponseEnvelope`
//! messages to stdout.
//!
//! Usage: `metasearch-host [CONFIG_PATH]`. Without a path the default
//! config location is used; a missing file means built-in defaults.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metasearch::AppConfig;
use metasearch::host::{CommandHandler, run_stdio_bridge};

/// Grace period for runtime shutdown. A pending stdin read cannot be
/// cancelled, so shutdown after `runtime.stop` must not wait on it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", config_path.display()))?;

    // Tracing goes to stderr only; stdout is reserved for the JSON protocol.
    let fallback_filter = config.logging.filter.clone();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_filter)),
        )
        .init();

    tracing::info!(config = %config_path.display(), "metasearch-host starting");

    let engine = metasearch::startup::initialize(&config).map_err(|e| {
        tracing::error!(error = %e, "metasearch-host failed to start");
        anyhow::anyhow!("metasearch-host startup failed: {e}")
    })?;

    run_stdio_bridge(CommandHandler::new(Arc::new(engine)))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "metasearch-host exited with error");
            anyhow::anyhow!("metasearch-host failed: {e}")
        })?;

    tracing::info!("metasearch-host shut down cleanly");
    Ok(())
}
