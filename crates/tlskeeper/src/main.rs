//! tlskeeper - Main entry point
//!
//! Reports renewal status for ACME-managed applications and prepares request
//! partitions for the external ACME client.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tlskeeper::acme::{render_json, render_table, render_tsv};
use tlskeeper::{AppName, Keeper, RenewalStatus};

/// tlskeeper - Certificate state and renewal scheduling
#[derive(Parser, Debug)]
#[command(name = "tlskeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// State root holding settings.kdl and apps/
    #[arg(short = 'r', long = "root", env = "TLSKEEPER_ROOT", default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose")]
    verbose: bool,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the renewal status of every managed application
    Status {
        #[arg(short = 'f', long = "format", value_enum, default_value_t = ReportFormat::Tsv)]
        format: ReportFormat,
    },
    /// Print the managed applications whose renewal is due
    Due,
    /// Resolve the request configuration and partition for an application
    Resolve {
        app: String,

        /// Mark the partition as the active one
        #[arg(long = "activate")]
        activate: bool,
    },
    /// Fail unless a contact email is configured for an application
    CheckEmail { app: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Tsv,
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let keeper = Keeper::open(&cli.root);
    debug!(root = %keeper.root().display(), "Opened state root");

    match cli.command {
        Commands::Status { format } => status(&keeper, format),
        Commands::Due => due(&keeper),
        Commands::Resolve { app, activate } => resolve(&keeper, AppName::new(app), activate),
        Commands::CheckEmail { app } => check_email(&keeper, AppName::new(app)),
    }
}

/// Logs go to stderr; stdout carries the report
fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn status(keeper: &Keeper, format: ReportFormat) -> Result<()> {
    let rows: Vec<RenewalStatus> = keeper
        .scanner()
        .scan()
        .context("Failed to enumerate applications")?
        .collect();

    let output = match format {
        ReportFormat::Tsv => render_tsv(&rows),
        ReportFormat::Table => render_table(&rows),
        ReportFormat::Json => {
            let mut json = render_json(&rows).context("Failed to serialize report")?;
            json.push('\n');
            json
        }
    };

    std::io::stdout()
        .write_all(output.as_bytes())
        .context("Failed to write report")?;
    info!(managed = rows.len(), "Renewal status reported");
    Ok(())
}

fn due(keeper: &Keeper) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let mut count = 0usize;

    for row in keeper
        .scanner()
        .due_for_renewal(Utc::now())
        .context("Failed to enumerate applications")?
    {
        writeln!(stdout, "{}", row.app).context("Failed to write output")?;
        count += 1;
    }

    info!(due = count, "Renewal check complete");
    Ok(())
}

fn resolve(keeper: &Keeper, app: AppName, activate: bool) -> Result<()> {
    let resolver = keeper.resolver();
    let resolved = if activate {
        resolver.resolve_and_activate(&app)
    } else {
        resolver.resolve(&app)
    }
    .with_context(|| format!("Failed to resolve request configuration for '{}'", app))?;

    info!(
        app = %app,
        partition = %resolved.key(),
        activated = activate,
        "Request configuration resolved"
    );

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", resolved.partition.path().display())?;
    writeln!(stdout, "{}", resolved.config.args().join(" "))?;
    Ok(())
}

fn check_email(keeper: &Keeper, app: AppName) -> Result<()> {
    let email = keeper
        .resolver()
        .check_email(&app)
        .with_context(|| format!("Cannot request a certificate for '{}'", app))?;

    println!("{}", email);
    Ok(())
}
