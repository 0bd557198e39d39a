//! Scan result persistence.
//!
//! The [`ResultStore`] trait is the only way probes and reports touch
//! persisted state. Every write is keyed by (session, url), and a result is
//! recorded at most once per key unless the caller asks to replace it.

mod schema;
mod sqlite_store;

pub use schema::SCHEMA_VERSION;
pub use sqlite_store::SqliteStore;

use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a probe learned about one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeRecord {
    /// The target answered with an HTTP response.
    Success {
        status_code: u16,
        page_title: Option<String>,
    },
    /// The request never produced a response.
    Failure { error: String },
}

/// How `record_result` treats an existing row for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Refuse to write when a row exists.
    Insert,
    /// Overwrite the row and drop headers and links stored for it.
    Replace,
}

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub name: String,
    pub network: String,
    pub ports: String,
    pub created_at: DateTime<Utc>,
}

/// One target's persisted outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub session: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub page_title: Option<String>,
    pub last_error: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// A response header captured from a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRow {
    pub url: String,
    pub name: String,
    pub value: String,
}

/// An anchor `href` captured from a target's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRow {
    pub url: String,
    pub link: Option<String>,
}

/// Storage backend for sessions and per-target results.
pub trait ResultStore: Send + Sync {
    /// Check whether a session with this name exists.
    fn session_exists(&self, name: &str) -> StorageResult<bool>;

    /// Create a session. Returns `false` and leaves the stored session
    /// untouched when the name is already taken.
    fn create_session(&self, name: &str, network: &str, ports: &str) -> StorageResult<bool>;

    /// Fetch one session.
    fn session(&self, name: &str) -> StorageResult<Option<SessionRecord>>;

    /// All sessions, oldest first.
    fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>>;

    /// Check whether a result is recorded for the key.
    fn has_result(&self, session: &str, url: &str) -> StorageResult<bool>;

    /// Record a probe outcome for the key.
    fn record_result(
        &self,
        session: &str,
        url: &str,
        record: &ProbeRecord,
        mode: WriteMode,
    ) -> StorageResult<()>;

    /// Record response headers, one row per pair.
    fn record_headers(
        &self,
        session: &str,
        url: &str,
        headers: &[(String, String)],
    ) -> StorageResult<()>;

    /// Record anchor hrefs, one row per anchor.
    fn record_links(&self, session: &str, url: &str, links: &[Option<String>])
        -> StorageResult<()>;

    /// Record a probe outcome with its headers and links in one
    /// transaction. On error nothing is written.
    fn record_probe(
        &self,
        session: &str,
        url: &str,
        record: &ProbeRecord,
        headers: &[(String, String)],
        links: &[Option<String>],
        mode: WriteMode,
    ) -> StorageResult<()>;

    /// Results of a session in the order they were recorded. With
    /// `successful_only`, rows without a status code are left out.
    fn results(&self, session: &str, successful_only: bool) -> StorageResult<Vec<ResultRow>>;

    /// Headers of a session, optionally for one url.
    fn headers(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<HeaderRow>>;

    /// Links of a session, optionally for one url.
    fn links(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<LinkRow>>;
}
