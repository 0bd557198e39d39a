//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `httpsweep scan --cidr <range>` - Probe every host and port of a range
//! - `httpsweep report available|session|data|html` - Inspect stored sessions

mod report;
mod scan;

pub use report::{ReportCommand, ReportKind};
pub use scan::ScanCommand;

use crate::config::AppSettings;
use crate::storage::SqliteStore;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// httpsweep - discover HTTP services across a network range.
///
/// Probes every usable host of a CIDR range on a list of ports, records the
/// status code, page title, response headers and page links of each service
/// in a named session, and reports on what was found.
#[derive(Parser, Debug)]
#[command(name = "httpsweep")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sweep a network range for HTTP services", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the result database
    #[arg(long, global = true, value_name = "PATH", env = "HTTPSWEEP_DB")]
    pub db: Option<PathBuf>,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe a network range for HTTP services
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Report on stored sessions
    #[command(alias = "r")]
    Report(ReportCommand),
}

/// State shared by every command handler.
pub struct Context {
    pub settings: AppSettings,
    pub store: Arc<SqliteStore>,
    pub verbose: u8,
    pub quiet: bool,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
