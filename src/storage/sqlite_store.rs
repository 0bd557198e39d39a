//! SQLite-backed result storage.
//!
//! A single connection behind a mutex serves every worker of a scan. WAL
//! journaling and a busy timeout let a second process (a report run while a
//! scan is in progress) share the file.

use super::schema;
use super::{HeaderRow, LinkRow, ProbeRecord, ResultRow, ResultStore, SessionRecord, WriteMode};
use crate::error::{StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistent result store backed by SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at a specific path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Location {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let store = Self::prepare(conn)?;
        debug!(path = %path.display(), journal = %mode, "result database opened");
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn split_record(record: &ProbeRecord) -> (Option<u16>, Option<&str>, Option<&str>) {
    match record {
        ProbeRecord::Success {
            status_code,
            page_title,
        } => (Some(*status_code), page_title.as_deref(), None),
        ProbeRecord::Failure { error } => (None, None, Some(error.as_str())),
    }
}

fn write_result(
    conn: &Connection,
    session: &str,
    url: &str,
    record: &ProbeRecord,
    mode: WriteMode,
) -> StorageResult<()> {
    let (status_code, page_title, last_error) = split_record(record);

    match mode {
        WriteMode::Insert => {
            let inserted = conn.execute(
                "INSERT INTO results (session, url, status_code, page_title, last_error, scanned_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(session, url) DO NOTHING",
                params![session, url, status_code, page_title, last_error, Utc::now()],
            )?;
            if inserted == 0 {
                return Err(StorageError::DuplicateResult {
                    session: session.to_string(),
                    url: url.to_string(),
                });
            }
        }
        WriteMode::Replace => {
            conn.execute(
                "INSERT INTO results (session, url, status_code, page_title, last_error, scanned_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(session, url) DO UPDATE SET \
                   status_code = excluded.status_code, \
                   page_title = excluded.page_title, \
                   last_error = excluded.last_error, \
                   scanned_at = excluded.scanned_at",
                params![session, url, status_code, page_title, last_error, Utc::now()],
            )?;
            conn.execute(
                "DELETE FROM headers WHERE session = ?1 AND url = ?2",
                params![session, url],
            )?;
            conn.execute(
                "DELETE FROM links WHERE session = ?1 AND url = ?2",
                params![session, url],
            )?;
        }
    }
    Ok(())
}

fn write_headers(
    conn: &Connection,
    session: &str,
    url: &str,
    headers: &[(String, String)],
) -> StorageResult<()> {
    let mut stmt =
        conn.prepare("INSERT INTO headers (session, url, name, value) VALUES (?1, ?2, ?3, ?4)")?;
    for (name, value) in headers {
        stmt.execute(params![session, url, name, value])?;
    }
    Ok(())
}

fn write_links(
    conn: &Connection,
    session: &str,
    url: &str,
    links: &[Option<String>],
) -> StorageResult<()> {
    let mut stmt = conn.prepare("INSERT INTO links (session, url, link) VALUES (?1, ?2, ?3)")?;
    for link in links {
        stmt.execute(params![session, url, link])?;
    }
    Ok(())
}

impl ResultStore for SqliteStore {
    fn session_exists(&self, name: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_session(&self, name: &str, network: &str, ports: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO sessions (name, network, ports, created_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO NOTHING",
            params![name, network, ports, Utc::now()],
        )?;
        Ok(inserted == 1)
    }

    fn session(&self, name: &str) -> StorageResult<Option<SessionRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT name, network, ports, created_at FROM sessions WHERE name = ?1",
                params![name],
                |row| {
                    Ok(SessionRecord {
                        name: row.get(0)?,
                        network: row.get(1)?,
                        ports: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, network, ports, created_at FROM sessions ORDER BY created_at, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionRecord {
                name: row.get(0)?,
                network: row.get(1)?,
                ports: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn has_result(&self, session: &str, url: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM results WHERE session = ?1 AND url = ?2",
                params![session, url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn record_result(
        &self,
        session: &str,
        url: &str,
        record: &ProbeRecord,
        mode: WriteMode,
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_result(&tx, session, url, record, mode)?;
        tx.commit()?;

        trace!(session, url, ?mode, "result recorded");
        Ok(())
    }

    fn record_headers(
        &self,
        session: &str,
        url: &str,
        headers: &[(String, String)],
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_headers(&tx, session, url, headers)?;
        tx.commit()?;
        Ok(())
    }

    fn record_links(
        &self,
        session: &str,
        url: &str,
        links: &[Option<String>],
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_links(&tx, session, url, links)?;
        tx.commit()?;
        Ok(())
    }

    fn record_probe(
        &self,
        session: &str,
        url: &str,
        record: &ProbeRecord,
        headers: &[(String, String)],
        links: &[Option<String>],
        mode: WriteMode,
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_result(&tx, session, url, record, mode)?;
        write_headers(&tx, session, url, headers)?;
        write_links(&tx, session, url, links)?;
        tx.commit()?;

        trace!(
            session,
            url,
            ?mode,
            headers = headers.len(),
            links = links.len(),
            "probe recorded"
        );
        Ok(())
    }

    fn results(&self, session: &str, successful_only: bool) -> StorageResult<Vec<ResultRow>> {
        let conn = self.conn()?;
        let sql = if successful_only {
            "SELECT session, url, status_code, page_title, last_error, scanned_at FROM results \
             WHERE session = ?1 AND status_code IS NOT NULL ORDER BY id"
        } else {
            "SELECT session, url, status_code, page_title, last_error, scanned_at FROM results \
             WHERE session = ?1 ORDER BY id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![session], |row| {
            Ok(ResultRow {
                session: row.get(0)?,
                url: row.get(1)?,
                status_code: row.get(2)?,
                page_title: row.get(3)?,
                last_error: row.get(4)?,
                scanned_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn headers(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<HeaderRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, name, value FROM headers \
             WHERE session = ?1 AND (?2 IS NULL OR url = ?2) ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session, url], |row| {
            Ok(HeaderRow {
                url: row.get(0)?,
                name: row.get(1)?,
                value: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn links(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<LinkRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, link FROM links \
             WHERE session = ?1 AND (?2 IS NULL OR url = ?2) ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session, url], |row| {
            Ok(LinkRow {
                url: row.get(0)?,
                link: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}
