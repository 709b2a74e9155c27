//! Durable history and preference storage.

mod schema;
pub mod sqlite;

use std::sync::Arc;

use metasearch_engine::{MemoryPersistence, Persistence};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use sqlite::{HistoryRecord, SqliteStore, StorageError};

/// Open the persistence backend selected by `[storage]`.
///
/// # Errors
///
/// Returns [`crate::AppError::Storage`] if the SQLite database cannot be opened.
pub fn open_persistence(config: &StorageConfig) -> Result<Arc<dyn Persistence>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.resolved_db_path())?;
            if let Some(days) = config.history_retention_days {
                store.prune_history(days)?;
            }
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::info!("using in-memory persistence; history is not kept across runs");
            Ok(Arc::new(MemoryPersistence::new()))
        }
    }
}
