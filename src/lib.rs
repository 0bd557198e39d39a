//! # httpsweep - HTTP Service Discovery Across Network Ranges
//!
//! httpsweep probes every usable host of a CIDR range on a list of ports,
//! records what each HTTP service answers in a named session, and reports on
//! the collected data.
//!
//! ## Features
//!
//! - **Lazy Enumeration**: Targets are generated on demand, never materialized
//! - **Bounded Concurrency**: A fixed pool of workers with optional rate limiting
//! - **Resumable Sessions**: Results are keyed by (session, url) and never duplicated
//! - **Rich Capture**: Status code, page title, response headers and page links
//! - **Multiple Output Formats**: Plain text, JSON, CSV and HTML
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use httpsweep::scanner::{run_scan, HttpConfig, HttpFetcherFactory, ScanJob};
//! use httpsweep::storage::SqliteStore;
//! use httpsweep::types::SessionName;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = ScanJob::new(
//!         SessionName::new("lab")?,
//!         "192.168.1.0/24".parse()?,
//!         "80,443s".parse()?,
//!     );
//!     let store = Arc::new(SqliteStore::open("lab.db".as_ref())?);
//!     let fetchers = Arc::new(HttpFetcherFactory::new(HttpConfig::new(Duration::from_secs(5))));
//!
//!     let summary = run_scan(job, store, fetchers, CancellationToken::new()).await?;
//!     println!("{} targets probed", summary.finished());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, ranges, targets and session names
//! - [`scanner`] - Probe worker and scan orchestrator
//! - [`storage`] - Result persistence behind the `ResultStore` trait
//! - [`config`] - Settings file and directory resolution
//! - [`error`] - Error types per layer
//! - [`output`] - Output formatting utilities
//! - [`cli`] - Command line definitions and handlers

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, NetworkError, ScanError, StorageError};
pub use scanner::{run_scan, Outcome, ScanJob, ScanSummary};
pub use storage::{ResultStore, SqliteStore};
pub use types::{NetworkRange, PortSpec, SessionName, Target, Targets};
