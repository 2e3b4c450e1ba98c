//! Ingestion driver: orchestrates fetch, credentials, connection and the
//! per-file load loop
//!
//! Run progression: fetch the archive, require the expected data
//! subdirectory, load credentials, build and check the connection, then
//! load each CSV sequentially over one shared sink. Failures before the
//! load loop are terminal; failures inside it are isolated per file and
//! collected into the final report. The sink is closed exactly once when
//! the loop exits, whatever the per-file outcomes were.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::connect::{self, ConnectionError};
use crate::credentials::{self, ConfigError};
use crate::fetch::{self, FetchConfig, FetchError};
use crate::loader;
use crate::sink::{PgSink, TableSink};
use tabload_common::types::{FileOutcome, LoadMode, LoadResult, RunReport, TableName};

/// Terminal failures of a run. Anything that happens after the connection
/// is ready is a per-file outcome in the report, not a `RunError`.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("expected data directory '{0}' is missing or unreadable")]
    DirectoryMissing(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connect(#[from] ConnectionError),
}

/// Everything one ingestion run needs, threaded in explicitly.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// URL of the remote zip archive
    pub archive_url: String,

    /// Directory the archive is extracted into
    pub extract_to: PathBuf,

    /// Subdirectory of `extract_to` that must contain the CSV files
    pub data_subdir: String,

    /// Path to the YAML credentials file
    pub credentials_path: PathBuf,

    /// Table write mode
    pub mode: LoadMode,

    /// Download settings
    pub fetch: FetchConfig,
}

impl RunRequest {
    pub fn new(
        archive_url: impl Into<String>,
        extract_to: impl Into<PathBuf>,
        data_subdir: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            archive_url: archive_url.into(),
            extract_to: extract_to.into(),
            data_subdir: data_subdir.into(),
            credentials_path: credentials_path.into(),
            mode: LoadMode::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Execute one ingestion run.
///
/// Credentials are not read and no connection is built until the expected
/// data directory is confirmed to exist.
pub async fn run(request: &RunRequest) -> Result<RunReport, RunError> {
    let extracted =
        fetch::fetch(&request.archive_url, &request.extract_to, &request.fetch).await?;

    let data_dir = extracted.join(&request.data_subdir);
    if !data_dir.is_dir() {
        return Err(RunError::DirectoryMissing(data_dir));
    }

    let files = discover_files(&data_dir)?;
    info!(count = files.len(), dir = %data_dir.display(), "Discovered tabular files");

    let creds = credentials::load(&request.credentials_path)?;
    let pool = connect::build_pool(&creds)?;
    connect::check(&pool).await?;

    let mut sink = PgSink::new(pool);
    Ok(load_files(&files, &mut sink, request.mode).await)
}

/// Enumerate `*.csv` files directly inside `dir`, sorted by name.
///
/// The search is deliberately non-recursive: nested directories in the
/// archive are ignored.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, RunError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|_| RunError::DirectoryMissing(dir.to_path_buf()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension() == Some(std::ffi::OsStr::new("csv"))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Load each file through the shared sink, isolating per-file failures.
///
/// The sink is closed exactly once, after the last file, on every path.
pub async fn load_files<S: TableSink>(
    files: &[PathBuf],
    sink: &mut S,
    mode: LoadMode,
) -> RunReport {
    let mut report = RunReport::new();

    for path in files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let outcome = match TableName::from_stem(&stem) {
            Ok(table) => match loader::load_file(path, &table, sink, mode).await {
                Ok(rows) => {
                    info!(%file, %table, rows, "Loaded file");
                    FileOutcome {
                        file,
                        table: table.to_string(),
                        result: LoadResult::Loaded { rows },
                    }
                },
                Err(e) => {
                    warn!(%file, %table, error = %e, "Failed to load file");
                    FileOutcome {
                        file,
                        table: table.to_string(),
                        result: LoadResult::Failed {
                            reason: e.to_string(),
                        },
                    }
                },
            },
            Err(e) => {
                warn!(%file, error = %e, "Skipping file with unusable name");
                FileOutcome {
                    file,
                    table: stem,
                    result: LoadResult::Failed {
                        reason: e.to_string(),
                    },
                }
            },
        };

        report.record(outcome);
    }

    sink.close().await;
    report.finish();
    report
}
