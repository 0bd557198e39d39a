//! Error types for httpsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Probe-level failures
//! (`NetworkError`) never escape a worker; they are stored against the
//! target and counted. Everything else is surfaced to the caller.

use crate::types::{PortError, SessionNameError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scan before or while it runs.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid range: {0}")]
    InvalidRange(#[from] TargetError),

    #[error("invalid port specification: {0}")]
    InvalidPortSpec(#[from] PortError),

    #[error("invalid session name: {0}")]
    InvalidSession(#[from] SessionNameError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("scan stalled: no probe finished in {waited_secs}s ({completed}/{total} done)")]
    Stalled {
        completed: u64,
        total: u64,
        waited_secs: u64,
    },

    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Connection-level failure of a single probe.
///
/// The message is what ends up in the `last_error` column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("TLS negotiation failed: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl NetworkError {
    /// Short label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Tls(_) => "tls",
            Self::Connect(_) => "connect",
            Self::Request(_) => "request",
        }
    }
}

/// Errors raised by the result store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database location {path}: {reason}")]
    Location { path: PathBuf, reason: String },

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaVersion { found: i64, supported: i64 },

    #[error("result for {url} in session '{session}' already recorded")]
    DuplicateResult { session: String, url: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directories")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings: {0}")]
    InvalidFormat(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for the command line interface.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI handlers.
pub type CliResult<T> = Result<T, CliError>;
