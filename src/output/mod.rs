//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, CSV and HTML renderings of
//! stored sessions.

mod csv_format;
mod html;
mod json_format;
mod plain;

pub use csv_format::{print_csv, write_csv};
pub use html::{html_escape, render_html};
pub use json_format::{print_json, write_json};
pub use plain::{
    print_error, print_info, print_results, print_scan_header, print_sessions, print_success,
    print_summary, print_target_data, print_warning,
};

use crate::cli::OutputFormat;
use crate::error::{StorageError, StorageResult};
use crate::storage::{HeaderRow, LinkRow, ResultRow, ResultStore, SessionRecord};
use serde::Serialize;
use std::io;

/// Everything stored for one session, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session: SessionRecord,
    pub results: Vec<ResultRow>,
    pub headers: Vec<HeaderRow>,
    pub links: Vec<LinkRow>,
}

impl SessionReport {
    /// Load a session from the store. With `successful_only`, rows without
    /// a status code are left out.
    pub fn load(
        store: &dyn ResultStore,
        name: &str,
        successful_only: bool,
    ) -> StorageResult<Self> {
        let session = store
            .session(name)?
            .ok_or_else(|| StorageError::SessionNotFound(name.to_string()))?;

        Ok(Self {
            results: store.results(name, successful_only)?,
            headers: store.headers(name, None)?,
            links: store.links(name, None)?,
            session,
        })
    }

    /// Number of results that carry a status code.
    pub fn responded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status_code.is_some())
            .count()
    }

    /// Headers captured for one url.
    pub fn headers_for<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a HeaderRow> + 'a {
        self.headers.iter().filter(move |h| h.url == url)
    }

    /// Links captured for one url.
    pub fn links_for<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a LinkRow> + 'a {
        self.links.iter().filter(move |l| l.url == url)
    }
}

/// Format and print a session's results according to the specified format.
pub fn format_results(report: &SessionReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => print_results(&report.results),
        OutputFormat::Json => print_json(report),
        OutputFormat::Csv => print_csv(&report.results),
    }
}
