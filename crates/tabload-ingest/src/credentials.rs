//! Database credential loading
//!
//! Credentials live in a YAML key-value file, outside the repository and
//! the command line. Every required key must be present before a
//! connection is built; a missing key fails fast with its name rather
//! than surfacing later as a generic connection failure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from reading the credentials file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("credentials file '{path}' could not be read: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("credentials file is missing required key '{0}'")]
    MissingKey(&'static str),
}

/// The connection parameters required to reach the target database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSet {
    /// Database family, e.g. "postgresql"
    pub database_type: String,

    /// Client driver name; recorded for compatibility with existing
    /// credential files, not used to select a driver here
    pub driver: String,

    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
}

/// Read a credential mapping from the YAML file at `path`.
///
/// Accepted keys, with aliases kept for existing credential files:
/// `DATABASE_TYPE`, `DBAPI_DRIVER` (alias `DBAPI`), `USER`, `PASSWORD`,
/// `HOST`, `PORT`, `DATABASE_NAME` (alias `DATABASE`).
pub fn load(path: &Path) -> Result<CredentialSet, ConfigError> {
    let unreadable = |reason: String| ConfigError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let mapping: HashMap<String, serde_yaml::Value> =
        serde_yaml::from_str(&raw).map_err(|e| unreadable(e.to_string()))?;

    let creds = CredentialSet {
        database_type: required(&mapping, "DATABASE_TYPE", &[])?,
        driver: required(&mapping, "DBAPI_DRIVER", &["DBAPI"])?,
        user: required(&mapping, "USER", &[])?,
        password: required(&mapping, "PASSWORD", &[])?,
        host: required(&mapping, "HOST", &[])?,
        port: required(&mapping, "PORT", &[])?,
        database: required(&mapping, "DATABASE_NAME", &["DATABASE"])?,
    };

    debug!(
        host = %creds.host,
        port = %creds.port,
        database = %creds.database,
        "Credentials loaded"
    );

    Ok(creds)
}

/// Look up a key (or one of its aliases) as a string scalar.
fn required(
    mapping: &HashMap<String, serde_yaml::Value>,
    key: &'static str,
    aliases: &[&str],
) -> Result<String, ConfigError> {
    if let Some(value) = mapping.get(key).and_then(scalar_to_string) {
        return Ok(value);
    }
    for alias in aliases {
        if let Some(value) = mapping.get(*alias).and_then(scalar_to_string) {
            return Ok(value);
        }
    }
    Err(ConfigError::MissingKey(key))
}

/// Stringify a YAML scalar; ports are commonly written unquoted.
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
