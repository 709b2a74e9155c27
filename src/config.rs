//! Application configuration loaded from `config.toml`.
//!
//! ```toml
//! [engine]
//! leg_timeout_ms = 8000
//! curated_engines = ["searx", "bing", "ecosia"]
//!
//! [http]
//! timeout_seconds = 8
//!
//! [providers]
//! duckduckgo = true
//! bing = true
//! searx_url = "http://localhost:8888"
//!
//! [storage]
//! backend = "sqlite"
//! history_retention_days = 90
//!
//! [logging]
//! filter = "info,metasearch_engine=debug"
//! ```
//!
//! Every section and field is optional; omitted values take their defaults.

use std::path::{Path, PathBuf};

use metasearch_engine::{AggregationError, EngineConfig, HttpConfig};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Which bundled providers are registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub duckduckgo: bool,
    pub bing: bool,
    /// Base URL of a SearXNG instance with JSON output enabled.
    /// The `searx` provider is registered only when this is set.
    pub searx_url: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            duckduckgo: true,
            bing: true,
            searx_url: None,
        }
    }
}

/// Where history and preferences are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Process memory; lost on exit.
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file. Defaults to [`crate::app_dirs::default_db_path`].
    pub db_path: Option<PathBuf>,
    /// Drop history rows older than this many days when the store opens.
    /// `None` keeps history forever.
    pub history_retention_days: Option<u32>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(crate::app_dirs::default_db_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/metasearch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_dir().join("config.toml")
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate().map_err(config_error)?;
        self.http.validate().map_err(config_error)?;
        if let Some(url) = &self.providers.searx_url {
            if url.trim().is_empty() {
                return Err(AppError::Config(
                    "providers.searx_url must not be empty when set".into(),
                ));
            }
        }
        if !self.providers.duckduckgo && !self.providers.bing && self.providers.searx_url.is_none()
        {
            return Err(AppError::Config("no providers enabled".into()));
        }
        if self.storage.history_retention_days == Some(0) {
            return Err(AppError::Config(
                "storage.history_retention_days must be greater than 0".into(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(AppError::Config("logging.filter must not be empty".into()));
        }
        Ok(())
    }
}

fn config_error(err: AggregationError) -> AppError {
    match err {
        AggregationError::Config(message) => AppError::Config(message),
        other => AppError::Engine(other),
    }
}
