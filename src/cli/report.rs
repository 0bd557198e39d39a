//! Report subcommand implementation.
//!
//! Reads stored sessions back out of the result database.

use crate::cli::{Context, OutputFormat};
use crate::error::{CliError, CliResult, StorageError};
use crate::output::{self, SessionReport};
use crate::storage::ResultStore;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Report on stored sessions.
#[derive(Parser, Debug)]
pub struct ReportCommand {
    #[command(subcommand)]
    pub kind: ReportKind,
}

/// Report views.
#[derive(Subcommand, Debug)]
pub enum ReportKind {
    /// List every recorded session
    Available,

    /// Show the results of a session
    Session {
        /// Session name
        #[arg(short, long)]
        name: String,

        /// Include targets that never answered
        #[arg(long)]
        full: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Show response headers and page links per url
    Data {
        /// Session name
        #[arg(short, long)]
        name: String,

        /// Limit the report to one url
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Write a self-contained HTML report
    Html {
        /// Session name
        #[arg(short, long)]
        name: String,

        /// Report file
        #[arg(short, long, default_value = "session_report.html")]
        output: PathBuf,

        /// Do not open the report once written
        #[arg(long)]
        no_open: bool,
    },
}

impl ReportCommand {
    /// Execute the report command.
    pub fn execute(&self, ctx: &Context) -> CliResult<()> {
        let store: &dyn ResultStore = ctx.store.as_ref();

        match &self.kind {
            ReportKind::Available => {
                output::print_sessions(&store.list_sessions()?)?;
            }
            ReportKind::Session { name, full, format } => {
                let report = SessionReport::load(store, name, !full)?;
                output::format_results(&report, *format)?;
            }
            ReportKind::Data { name, url } => {
                print_data(store, name, url.as_deref())?;
            }
            ReportKind::Html {
                name,
                output: path,
                no_open,
            } => {
                let report = SessionReport::load(store, name, true)?;
                write_html(&report, path)?;
                if !ctx.quiet {
                    output::print_success(&format!("report written to {}", path.display()));
                }
                if !no_open {
                    open_in_browser(path);
                }
            }
        }

        Ok(())
    }
}

fn print_data(store: &dyn ResultStore, name: &str, url: Option<&str>) -> CliResult<()> {
    if !store.session_exists(name)? {
        return Err(StorageError::SessionNotFound(name.to_string()).into());
    }

    let urls: Vec<String> = match url {
        Some(url) => vec![url.to_string()],
        None => store
            .results(name, true)?
            .into_iter()
            .map(|row| row.url)
            .collect(),
    };

    for url in &urls {
        let headers = store.headers(name, Some(url))?;
        let links = store.links(name, Some(url))?;
        output::print_target_data(url, &headers, &links)?;
    }
    Ok(())
}

fn write_html(report: &SessionReport, path: &Path) -> CliResult<()> {
    let mut page = String::new();
    output::render_html(&mut page, report)
        .map_err(|e| CliError::Other(format!("failed to render report: {}", e)))?;
    fs::write(path, page)?;
    debug!(path = %path.display(), "html report written");
    Ok(())
}

/// Hand the report to the platform's default opener. Failure only warns.
fn open_in_browser(path: &Path) {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    #[cfg(target_os = "macos")]
    let status = Command::new("open").arg(&target).status();

    #[cfg(target_os = "windows")]
    let status = Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(&target)
        .status();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let status = Command::new("xdg-open").arg(&target).status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => warn!(code = ?s.code(), "report opener exited with failure"),
        Err(e) => {
            warn!(error = %e, "could not launch report opener");
            output::print_info(&format!("open {} in a browser to view it", target.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppSettings;
    use crate::storage::{ProbeRecord, SqliteStore, WriteMode};
    use std::sync::Arc;

    fn context() -> Context {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_session("lab", "10.0.0.0/30", "80").unwrap();
        store
            .record_result(
                "lab",
                "http://10.0.0.1:80",
                &ProbeRecord::Success {
                    status_code: 200,
                    page_title: Some("X".into()),
                },
                WriteMode::Insert,
            )
            .unwrap();
        Context {
            settings: AppSettings::default(),
            store: Arc::new(store),
            verbose: 0,
            quiet: true,
        }
    }

    fn parse(args: &[&str]) -> ReportCommand {
        let mut argv = vec!["report"];
        argv.extend_from_slice(args);
        ReportCommand::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_unknown_session_is_an_error() {
        let ctx = context();
        for args in [
            &["session", "-n", "nope"][..],
            &["data", "-n", "nope"][..],
            &["html", "-n", "nope", "--no-open"][..],
        ] {
            let err = parse(args).execute(&ctx).unwrap_err();
            assert!(matches!(
                err,
                CliError::Storage(StorageError::SessionNotFound(_))
            ));
        }
    }

    #[test]
    fn test_html_report_written() {
        let ctx = context();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        parse(&["html", "-n", "lab", "-o", path.to_str().unwrap(), "--no-open"])
            .execute(&ctx)
            .unwrap();

        let page = fs::read_to_string(&path).unwrap();
        assert!(page.contains("http://10.0.0.1:80"));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_html_defaults() {
        match parse(&["html", "-n", "lab"]).kind {
            ReportKind::Html {
                output, no_open, ..
            } => {
                assert_eq!(output, PathBuf::from("session_report.html"));
                assert!(!no_open);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }
}
