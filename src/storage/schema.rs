//! SQLite DDL for the history and preference store.

use rusqlite::Connection;

/// Version stamped into `schema_meta` for fresh databases.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL. Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per answered search, including cache hits.
CREATE TABLE IF NOT EXISTS search_history (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    query             TEXT NOT NULL,
    page              INTEGER NOT NULL DEFAULT 1,
    safe_search       INTEGER NOT NULL DEFAULT 1,
    result_count      INTEGER NOT NULL DEFAULT 0,
    engine_used       TEXT NOT NULL,   -- tier label or engine name
    client_id         TEXT,
    served_from_cache INTEGER NOT NULL DEFAULT 0,
    created_at        INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_history_created_at ON search_history(created_at);
CREATE INDEX IF NOT EXISTS idx_history_client     ON search_history(client_id);

CREATE TABLE IF NOT EXISTS client_preferences (
    client_id        TEXT PRIMARY KEY,
    default_engine   TEXT NOT NULL DEFAULT 'default',
    results_per_page INTEGER NOT NULL DEFAULT 10,
    safe_search      INTEGER NOT NULL DEFAULT 1,
    updated_at       INTEGER NOT NULL DEFAULT 0
);
"#;

/// Apply the full schema and seed the schema version on a fresh database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the current schema version; `None` if it was never stamped.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_schema_creates_tables() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply_schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"schema_meta".to_owned()));
        assert!(tables.contains(&"search_history".to_owned()));
        assert!(tables.contains(&"client_preferences".to_owned()));
    }

    #[test]
    fn apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("first apply_schema");
        apply_schema(&conn).expect("second apply_schema");
    }

    #[test]
    fn schema_version_is_seeded() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply_schema");
        let version = read_schema_version(&conn).expect("read_schema_version");
        assert_eq!(version, Some(CURRENT_SCHEMA_VERSION));
    }
}
