//! Error types for the metasearch host.

use metasearch_engine::{AggregationError, PersistenceError};

/// Top-level error type for the host application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// History / preference storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Aggregation engine error.
    #[error(transparent)]
    Engine(#[from] AggregationError),

    /// Host protocol error.
    #[error("host error: {0}")]
    Host(String),
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
