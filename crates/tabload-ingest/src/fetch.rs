//! Archive fetching: download a remote zip and extract it to a directory
//!
//! The download lands in a temporary file that is removed after the attempt
//! on every path, success or failure. The archive is validated (the zip
//! central directory must open) before anything is written to the
//! destination, so a corrupt download never leaves a partial extraction.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Default network timeout for the whole download.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const USER_AGENT: &str = concat!("tabload/", env!("CARGO_PKG_VERSION"));

/// Errors from downloading or extracting a remote archive.
///
/// Both variants are terminal for the run: the caller reports and exits,
/// it does not retry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("download failed: {0}")]
    DownloadFailed(#[from] reqwest::Error),

    #[error("downloaded file is not a valid zip archive")]
    InvalidArchive,

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to extract archive: {0}")]
    Extract(#[from] zip::result::ZipError),
}

/// Fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for the whole download, in seconds
    pub timeout_secs: u64,

    /// Directory for the temporary download file (system temp when `None`)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scratch_dir: None,
        }
    }
}

impl FetchConfig {
    fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Download the archive at `url` and extract it into `destination`.
///
/// The destination directory is created if absent. Returns the destination
/// path on success.
pub async fn fetch(
    url: &str,
    destination: &Path,
    config: &FetchConfig,
) -> Result<PathBuf, FetchError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;

    info!(url, "Downloading archive");
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    info!(size = bytes.len(), "Download complete");

    // Scoped to this call: the temp file is deleted on drop, so the
    // download never survives the attempt.
    let mut download = NamedTempFile::new_in(config.scratch_dir())?;
    download.write_all(&bytes)?;
    download.as_file_mut().flush()?;

    let reader = download.reopen()?;
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|_| FetchError::InvalidArchive)?;
    debug!(entries = archive.len(), "Archive validated");

    std::fs::create_dir_all(destination)?;
    archive.extract(destination)?;
    info!(destination = %destination.display(), "Archive extracted");

    Ok(destination.to_path_buf())
}
