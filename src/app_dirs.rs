//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/metasearch/` | `~/.local/share/metasearch/` |
//! | Config | `~/Library/Application Support/metasearch/` | `~/.config/metasearch/` |
//!
//! `METASEARCH_DATA_DIR` and `METASEARCH_CONFIG_DIR` override the defaults.

use std::path::PathBuf;

const APP_NAME: &str = "metasearch";

/// Directory for the history and preference database.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("METASEARCH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/metasearch-data"))
}

/// Directory holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("METASEARCH_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/metasearch-config"))
}

/// Default SQLite database path.
#[must_use]
pub fn default_db_path() -> PathBuf {
    data_dir().join("metasearch.db")
}
