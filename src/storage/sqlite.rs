//! SQLite-backed [`Persistence`] implementation.
//!
//! A single database file holds search history and per-client preferences.
//! rusqlite is blocking, so every trait call runs on the blocking pool via
//! [`tokio::task::spawn_blocking`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metasearch_engine::{
    HistoryEntry, Persistence, PersistenceError, Preferences, PreferencesPatch,
};
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::{apply_schema, read_schema_version};

/// A history row with its storage metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub entry: HistoryEntry,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("blocking task failed: {0}")]
    Task(String),

    #[error("invalid stored value: {0}")]
    Invalid(String),
}

impl From<StorageError> for PersistenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Invalid(message) => PersistenceError::Invalid(message),
            other => PersistenceError::Storage(other.to_string()),
        }
    }
}

impl From<StorageError> for crate::error::AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// SQLite history and preference store.
///
/// Cloning is cheap; clones share one connection behind a `Mutex`.
#[derive(Clone)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        tracing::info!(path = %path.display(), "sqlite store opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Ephemeral database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Fails if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>, StorageError> {
        let conn = lock(&self.conn)?;
        Ok(read_schema_version(&conn)?)
    }

    /// Most recent history rows, newest first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryRecord>, StorageError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, query, page, safe_search, result_count, engine_used, client_id,
                    served_from_cache, created_at
             FROM search_history
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_history)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    /// Delete history older than `retention_days`. Returns the number of rows removed.
    pub fn prune_history(&self, retention_days: u32) -> Result<usize, StorageError> {
        let cutoff = Utc::now().timestamp() - i64::from(retention_days) * 86_400;
        let conn = lock(&self.conn)?;
        let removed = conn.execute(
            "DELETE FROM search_history WHERE created_at < ?1",
            params![cutoff],
        )?;
        if removed > 0 {
            tracing::info!(removed, retention_days, "pruned search history");
        }
        Ok(removed)
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            work(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock().map_err(|e| StorageError::Lock(e.to_string()))
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<HistoryRecord, StorageError>> {
    let page: i64 = row.get(2)?;
    let result_count: i64 = row.get(4)?;
    let created_at: i64 = row.get(8)?;
    let entry = HistoryEntry {
        query: row.get(1)?,
        page: 0,
        safe_search: row.get(3)?,
        result_count: 0,
        engine_used: row.get(5)?,
        client_id: row.get(6)?,
        served_from_cache: row.get(7)?,
    };
    let id: i64 = row.get(0)?;
    Ok(decode_history(id, entry, page, result_count, created_at))
}

fn decode_history(
    id: i64,
    mut entry: HistoryEntry,
    page: i64,
    result_count: i64,
    created_at: i64,
) -> Result<HistoryRecord, StorageError> {
    entry.page = u32::try_from(page)
        .map_err(|_| StorageError::Invalid(format!("history {id}: page {page}")))?;
    entry.result_count = usize::try_from(result_count)
        .map_err(|_| StorageError::Invalid(format!("history {id}: result_count {result_count}")))?;
    let created_at = DateTime::<Utc>::from_timestamp(created_at, 0)
        .ok_or_else(|| StorageError::Invalid(format!("history {id}: created_at {created_at}")))?;
    Ok(HistoryRecord {
        id,
        entry,
        created_at,
    })
}

fn insert_history(conn: &Connection, entry: &HistoryEntry) -> Result<(), StorageError> {
    let result_count = i64::try_from(entry.result_count).unwrap_or(i64::MAX);
    conn.execute(
        "INSERT INTO search_history
            (query, page, safe_search, result_count, engine_used, client_id,
             served_from_cache, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.query,
            entry.page,
            entry.safe_search,
            result_count,
            entry.engine_used,
            entry.client_id,
            entry.served_from_cache,
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

fn load_preferences(conn: &Connection, client_id: &str) -> Result<Preferences, StorageError> {
    let row = conn
        .query_row(
            "SELECT default_engine, results_per_page, safe_search
             FROM client_preferences WHERE client_id = ?1",
            params![client_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((default_engine, results_per_page, safe_search)) = row else {
        return Ok(Preferences::default());
    };
    let results_per_page = u32::try_from(results_per_page).map_err(|_| {
        StorageError::Invalid(format!(
            "preferences for {client_id}: results_per_page {results_per_page}"
        ))
    })?;
    Ok(Preferences {
        default_engine,
        results_per_page,
        safe_search,
    })
}

fn store_preferences(
    conn: &Connection,
    client_id: &str,
    prefs: &Preferences,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO client_preferences
            (client_id, default_engine, results_per_page, safe_search, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(client_id) DO UPDATE SET
            default_engine   = excluded.default_engine,
            results_per_page = excluded.results_per_page,
            safe_search      = excluded.safe_search,
            updated_at       = excluded.updated_at",
        params![
            client_id,
            prefs.default_engine,
            prefs.results_per_page,
            prefs.safe_search,
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn record_history(&self, entry: HistoryEntry) -> Result<(), PersistenceError> {
        self.blocking(move |conn| insert_history(conn, &entry))
            .await
            .map_err(Into::into)
    }

    async fn get_preferences(&self, client_id: &str) -> Result<Preferences, PersistenceError> {
        let client_id = client_id.to_owned();
        self.blocking(move |conn| load_preferences(conn, &client_id))
            .await
            .map_err(Into::into)
    }

    async fn update_preferences(
        &self,
        client_id: &str,
        patch: PreferencesPatch,
    ) -> Result<Preferences, PersistenceError> {
        let client_id = client_id.to_owned();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut prefs = load_preferences(&tx, &client_id)?;
            prefs.apply(&patch);
            store_preferences(&tx, &client_id, &prefs)?;
            tx.commit()?;
            Ok(prefs)
        })
        .await
        .map_err(Into::into)
    }
}
