//! Metasearch: a multi-engine web search aggregator behind a JSON stdio host.
//!
//! The search logic lives in the `metasearch-engine` member crate. This
//! crate adds everything needed to run it as a process:
//!
//! - **Configuration**: `config.toml` with `[engine]`, `[http]`,
//!   `[providers]`, `[storage]` and `[logging]` sections
//! - **Storage**: SQLite-backed search history and client preferences
//! - **Startup**: provider registration from configuration
//! - **Host**: newline-delimited JSON command envelopes over stdin/stdout
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! # async fn run() -> metasearch::Result<()> {
//! let config = metasearch::AppConfig::load_or_default(&metasearch::AppConfig::default_config_path())?;
//! let engine = metasearch::startup::initialize(&config)?;
//! let handler = metasearch::host::CommandHandler::new(Arc::new(engine));
//! metasearch::host::run_stdio_bridge(handler).await?;
//! # Ok(())
//! # }
//! ```

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod host;
pub mod startup;
pub mod storage;

pub use config::{AppConfig, LoggingConfig, ProvidersConfig, StorageBackend, StorageConfig};
pub use error::{AppError, Result};
pub use storage::SqliteStore;

pub use metasearch_engine as engine;
