use anyhow::Context as _;
use clap::Parser;
use httpsweep::cli::{Cli, Commands, Context};
use httpsweep::config::{AppSettings, Paths};
use httpsweep::output;
use httpsweep::storage::SqliteStore;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v; the default keeps the progress bar clean.
    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&describe(&e));
            ExitCode::FAILURE
        }
    }
}

/// One-line error message; causes already quoted by their parent are left out.
fn describe(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::resolve().context("could not determine the user directories")?;

    let settings = match &cli.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::load(&paths).context("failed to load settings")?,
    };

    let db = settings.database_path(&paths, cli.db.as_deref());
    let store = SqliteStore::open(&db)
        .with_context(|| format!("failed to open result database {}", db.display()))?;
    debug!(db = %db.display(), "result database ready");

    let ctx = Context {
        settings,
        store: Arc::new(store),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Scan(cmd) => cmd.execute(&ctx).await?,
        Commands::Report(cmd) => cmd.execute(&ctx)?,
    }

    Ok(())
}
