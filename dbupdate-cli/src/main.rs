//! dbupdate CLI - database bootstrap for the events system
//!
//! Makes sure the configured MySQL database exists and creates the
//! `crs_event` table from the column names in `update/config.json`.
//! Connection settings come from `DB_*` variables, optionally read from a
//! `.env` file in the base directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dbupdate_core::backend::DEFAULT_CONNECT_TIMEOUT_SECS;
use dbupdate_core::{
    default_descriptor_path, load_dotenv, plan, BootstrapError, Bootstrapper, ConnectionSettings,
    Console, MySqlConnector, Outcome, SchemaDescriptor,
};
use tracing::{debug, info};

mod tracing_setup;

const EXIT_CONNECTION_FAILED: u8 = 1;
const EXIT_CONFIG_NOT_FOUND: u8 = 2;
const EXIT_UPDATE_FAILED: u8 = 3;
const EXIT_ENTRIES_FAILED: u8 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "dbupdate",
    author,
    version,
    about = "Create the application database and events table if they are missing",
    long_about = "Connects to the MySQL server named by DB_HOST/DB_PORT, creates DB_NAME if \
                  it does not exist, then creates the crs_event table using the column names \
                  listed in update/config.json. Safe to run repeatedly."
)]
struct Cli {
    /// Directory holding .env and update/config.json (default: current directory)
    #[arg(long = "base-dir", value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Descriptor path (default: <base-dir>/update/config.json)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait for the server before giving up
    #[arg(
        long = "connect-timeout",
        value_name = "SECS",
        env = "DB_CONNECT_TIMEOUT",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
    )]
    connect_timeout: u64,

    /// Validate the descriptor and print the statements without connecting
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Exit non-zero when any descriptor entry fails
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Map a finished run to the process exit status
fn exit_code(outcome: &Outcome, strict: bool) -> u8 {
    match outcome {
        Outcome::Committed(report) if strict && report.has_failures() => EXIT_ENTRIES_FAILED,
        Outcome::Committed(_) => 0,
        Outcome::ConnectionFailed { .. } => EXIT_CONNECTION_FAILED,
        Outcome::ConfigNotFound { .. } => EXIT_CONFIG_NOT_FOUND,
        Outcome::UpdateFailed { .. } => EXIT_UPDATE_FAILED,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    let base_dir = match cli.base_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let descriptor_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_descriptor_path(&base_dir));
    debug!(base_dir = %base_dir.display(), descriptor = %descriptor_path.display(), "resolved paths");

    if cli.dry_run {
        return Ok(ExitCode::from(run_dry(&descriptor_path, cli.strict)));
    }

    load_dotenv(&base_dir);
    let settings = ConnectionSettings::from_env();
    debug!(?settings, "connection settings");

    let connector = MySqlConnector::new(Duration::from_secs(cli.connect_timeout));
    let mut console = Console::stdout();
    let outcome = Bootstrapper::new(&settings, descriptor_path, &connector)
        .run(&mut console)
        .await;

    let code = exit_code(&outcome, cli.strict);
    info!(exit_code = code, "finished");
    Ok(ExitCode::from(code))
}

/// Print what a run would execute, without connecting
fn run_dry(descriptor_path: &Path, strict: bool) -> u8 {
    let mut console = Console::stdout();

    let descriptor = match SchemaDescriptor::load(descriptor_path) {
        Ok(descriptor) => descriptor,
        Err(BootstrapError::ConfigNotFound { path }) => {
            console.config_not_found(&path);
            console.flush();
            return EXIT_CONFIG_NOT_FOUND;
        }
        Err(e) => {
            console.update_failure(&e.to_string());
            console.flush();
            return EXIT_UPDATE_FAILED;
        }
    };

    let reports = plan(&descriptor);
    for report in &reports {
        match &report.result {
            Ok(sql) => println!("-- entry {}\n{};", report.index, sql),
            Err(e) => println!("-- entry {} skipped: {}", report.index, e),
        }
    }

    let failed = reports.iter().filter(|r| !r.is_applied()).count();
    info!(entries = reports.len(), failed, "dry run complete");
    if strict && failed > 0 {
        EXIT_ENTRIES_FAILED
    } else {
        0
    }
}
