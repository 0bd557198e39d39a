use crate::error::{StorageError, StorageResult};
use rusqlite::Connection;
use tracing::info;

/// Version written to `PRAGMA user_version` once the tables exist.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    name        TEXT PRIMARY KEY,
    network     TEXT NOT NULL,
    ports       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- One row per (session, url)
CREATE TABLE IF NOT EXISTS results (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session     TEXT NOT NULL REFERENCES sessions(name) ON DELETE CASCADE,
    url         TEXT NOT NULL,
    status_code INTEGER,
    page_title  TEXT,
    last_error  TEXT,
    scanned_at  TEXT NOT NULL,
    UNIQUE (session, url)
);

CREATE TABLE IF NOT EXISTS headers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session     TEXT NOT NULL,
    url         TEXT NOT NULL,
    name        TEXT NOT NULL,
    value       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_headers_target ON headers(session, url);

CREATE TABLE IF NOT EXISTS links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session     TEXT NOT NULL,
    url         TEXT NOT NULL,
    link        TEXT
);
CREATE INDEX IF NOT EXISTS idx_links_target ON links(session, url);
"#;

/// Create the tables on a fresh database and check the version of an
/// existing one.
pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if found > SCHEMA_VERSION {
        return Err(StorageError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if found < SCHEMA_VERSION {
        info!(from = found, to = SCHEMA_VERSION, "initializing result database");
        conn.execute_batch(SCHEMA_SQL)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_initialize_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(
            table_names(&conn),
            vec!["headers", "links", "results", "sessions"]
        );

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(table_names(&conn).len(), 4);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        assert!(matches!(
            initialize(&conn),
            Err(StorageError::SchemaVersion { .. })
        ));
    }
}
