//! Common types used across tabload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum identifier length accepted by PostgreSQL (NAMEDATALEN - 1).
pub const MAX_TABLE_NAME_LEN: usize = 63;

/// Error returned when a file stem cannot be used as a table name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a valid table identifier (expected letter or underscore followed by letters, digits or underscores, at most {MAX_TABLE_NAME_LEN} chars)")]
pub struct InvalidTableName(pub String);

/// A validated table identifier derived from a file stem.
///
/// Tables are named after the CSV file they were loaded from, so the stem
/// must be a usable identifier in the target database. Invalid stems are
/// rejected up front rather than passed through to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// Validate a file stem as a table identifier.
    pub fn from_stem(stem: &str) -> Result<Self, InvalidTableName> {
        let mut chars = stem.chars();
        let valid_first = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_first || !valid_rest || stem.len() > MAX_TABLE_NAME_LEN {
            return Err(InvalidTableName(stem.to_string()));
        }

        Ok(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier double-quoted for direct use in SQL statements.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How rows are written to a table that may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop any existing table of the same name and recreate it from the
    /// new data. Destructive by design.
    #[default]
    Replace,
    /// Create the table if absent and append the new rows.
    Append,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Replace => write!(f, "replace"),
            LoadMode::Append => write!(f, "append"),
        }
    }
}

/// Outcome of loading one tabular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadResult {
    /// The file was parsed and written; `rows` excludes the header.
    Loaded { rows: u64 },
    /// The file was attempted but could not be loaded.
    Failed { reason: String },
}

/// One file's entry in the final run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// File name as discovered (e.g., "orders.csv")
    pub file: String,

    /// Derived table name (the raw stem when derivation failed)
    pub table: String,

    /// Load outcome for this file
    pub result: LoadResult,
}

/// Aggregate result of one ingestion run.
///
/// Per-file failures are isolated during the run and collected here; the
/// caller decides how to surface them (summary text, JSON, exit code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of files attempted
    pub attempted: usize,

    /// Number of files fully loaded
    pub loaded: usize,

    /// Number of files that failed
    pub failed: usize,

    /// Per-file outcomes, in processing order
    pub outcomes: Vec<FileOutcome>,

    /// When the load loop started
    pub started_at: DateTime<Utc>,

    /// When the load loop finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            attempted: 0,
            loaded: 0,
            failed: 0,
            outcomes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record one file's outcome and update the counters.
    pub fn record(&mut self, outcome: FileOutcome) {
        self.attempted += 1;
        match outcome.result {
            LoadResult::Loaded { .. } => self.loaded += 1,
            LoadResult::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Mark the run as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// True when every attempted file loaded.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
