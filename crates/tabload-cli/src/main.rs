//! Tabload - archive-to-PostgreSQL bulk loader

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use tabload_common::logging::{init_logging, LogConfig, LogLevel};
use tabload_common::types::{LoadMode, LoadResult, RunReport};
use tabload_ingest::driver::{self, RunError, RunRequest};
use tabload_ingest::fetch::{FetchConfig, DEFAULT_TIMEOUT_SECS};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "tabload")]
#[command(author, version)]
#[command(about = "Download a zip archive and bulk-load its CSV files into PostgreSQL tables")]
struct Cli {
    /// URL of the remote zip archive
    #[arg(long)]
    url: String,

    /// Subdirectory of the extracted archive that holds the CSV files
    #[arg(long)]
    data_subdir: String,

    /// Directory to extract the archive into
    #[arg(long, default_value = "./extracted")]
    extract_to: PathBuf,

    /// Path to the YAML credentials file
    #[arg(long, env = "TABLOAD_CREDENTIALS")]
    credentials: PathBuf,

    /// How to write tables that already exist
    #[arg(long, value_enum, default_value_t = ModeArg::Replace)]
    mode: ModeArg,

    /// Download timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Print the run report as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Replace,
    Append,
}

impl From<ModeArg> for LoadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => LoadMode::Replace,
            ModeArg::Append => LoadMode::Append,
        }
    }
}

#[tokio::main]
async fn main() {
    // A .env file is optional; TABLOAD_CREDENTIALS may come from it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging; LOG_* environment variables take precedence
    // over the verbose flag
    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose && std::env::var("LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Debug;
    }

    // The CLI should still work when logging cannot initialize
    let _ = init_logging(&log_config);

    let mut request = RunRequest::new(cli.url, cli.extract_to, cli.data_subdir, cli.credentials);
    request.mode = cli.mode.into();
    request.fetch = FetchConfig {
        timeout_secs: cli.timeout,
        ..FetchConfig::default()
    };

    match driver::run(&request).await {
        Ok(report) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).unwrap_or_default()
                );
            } else {
                print_summary(&report);
            }
            process::exit(if report.is_success() { 0 } else { 1 });
        },
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            process::exit(exit_code(&e));
        },
    }
}

/// One distinct exit code per terminal failure state. Per-file failures
/// exit 1 after the full report is printed.
fn exit_code(error: &RunError) -> i32 {
    match error {
        RunError::Fetch(_) => 2,
        RunError::DirectoryMissing(_) => 3,
        RunError::Config(_) => 4,
        RunError::Connect(_) => 5,
    }
}

/// Human-readable summary naming every file, its outcome, and the cause
/// of each failure.
fn print_summary(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            LoadResult::Loaded { rows } => {
                println!(
                    "{} {} -> {} ({} rows)",
                    "✓".green(),
                    outcome.file,
                    outcome.table,
                    rows
                );
            },
            LoadResult::Failed { reason } => {
                println!("{} {}: {}", "✗".red(), outcome.file, reason);
            },
        }
    }

    println!();
    println!(
        "{} file(s) attempted, {} loaded, {} failed",
        report.attempted, report.loaded, report.failed
    );
}
