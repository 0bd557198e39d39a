//! Scan subcommand implementation.
//!
//! Handles the `httpsweep scan --cidr <range>` command.

use crate::cli::Context;
use crate::config::AppSettings;
use crate::error::{CliError, CliResult, ScanError};
use crate::output;
use crate::scanner::{run_scan, HttpConfig, HttpFetcherFactory, ScanJob, MAX_TIMEOUT};
use crate::storage::ResultStore;
use crate::types::{NetworkRange, PortSpec, SessionName};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Probe a network range for HTTP services.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Range to scan in CIDR notation
    ///
    /// Examples:
    ///   192.168.1.0/24     Every usable host of a /24
    ///   10.0.0.5           A single address
    #[arg(short, long, value_name = "RANGE")]
    pub cidr: String,

    /// Session name; a random one is generated when omitted
    #[arg(short, long)]
    pub name: Option<String>,

    /// Ports to probe, comma separated; a trailing 's' selects https (e.g. "80,443s,8443s")
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Replace results already recorded for a url
    #[arg(short = 'O', long = "override")]
    pub override_existing: bool,

    /// Number of concurrent probes
    #[arg(short = 'T', long)]
    pub threads: Option<usize>,

    /// Rate limit in requests per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Probes served before a worker rebuilds its HTTP client
    #[arg(long)]
    pub recycle_after: Option<usize>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Reject invalid TLS certificates
    #[arg(long)]
    pub verify_tls: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let settings = &ctx.settings;

        let ports = PortSpec::parse_or_default(
            self.ports.as_deref().unwrap_or_default(),
            &settings.default_ports,
        )
        .map_err(ScanError::from)?;
        let range = NetworkRange::parse(&self.cidr).map_err(ScanError::from)?;
        let session = SessionName::or_generate(self.name.as_deref()).map_err(ScanError::from)?;
        let timeout = self.timeout(settings)?;
        let threads = self.threads.unwrap_or(settings.default_threads);

        let store: Arc<dyn ResultStore> = ctx.store.clone();
        let job = ScanJob::new(session, range, ports)
            .with_threads(threads)
            .with_timeout(timeout)
            .with_override(self.override_existing)
            .with_recycle_after(self.recycle_after.unwrap_or(settings.recycle_after))
            .with_rate_limit(self.rate_limit.unwrap_or(settings.rate_limit));
        let job = if ctx.verbose == 0 && !ctx.quiet {
            job.with_progress()
        } else {
            job
        };

        if !ctx.quiet {
            let created = !store.session_exists(job.session.as_str())?;
            output::print_scan_header(
                job.session.as_str(),
                created,
                &job.range.to_string(),
                job.range.host_count(),
                job.ports.len(),
            );
        }

        let fetchers = Arc::new(HttpFetcherFactory::new(self.http_config(settings, timeout)));

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight probes");
                interrupt.cancel();
            }
        });

        info!(cidr = %self.cidr, threads, "starting scan");
        let result = run_scan(job, store, fetchers, cancel).await;
        ctrl_c.abort();
        let summary = result?;

        if !ctx.quiet {
            output::print_summary(&summary)?;
        }
        if summary.interrupted {
            output::print_warning("scan was interrupted; re-run the same command to resume");
        }

        Ok(())
    }

    fn timeout(&self, settings: &AppSettings) -> CliResult<Duration> {
        let secs = self.timeout.unwrap_or(settings.default_timeout_secs);
        match Duration::try_from_secs_f64(secs) {
            Ok(timeout) if !timeout.is_zero() && timeout <= MAX_TIMEOUT => Ok(timeout),
            _ => Err(CliError::Other(format!(
                "timeout must be between 0 and {} seconds, got {}",
                MAX_TIMEOUT.as_secs(),
                secs
            ))),
        }
    }

    fn http_config(&self, settings: &AppSettings, timeout: Duration) -> HttpConfig {
        let config = HttpConfig::new(timeout)
            .with_certificate_checks(self.verify_tls || !settings.accept_invalid_certs);
        match self.user_agent.as_ref().or(settings.user_agent.as_ref()) {
            Some(agent) => config.with_user_agent(agent.clone()),
            None => config,
        }
    }
}
