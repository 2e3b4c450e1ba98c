//! Connection factory: credential mapping -> PostgreSQL pool
//!
//! Pool construction is lazy and performs no I/O; the target is first
//! reached when a connection is acquired. `check` makes that step explicit
//! so callers get a named error before any table is touched.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::debug;

/// Pool acquire timeout; also bounds how long `check` waits.
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Errors from building or opening a database connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("unsupported database type '{0}' (expected 'postgresql')")]
    UnsupportedDatabase(String),

    #[error("invalid port '{0}' in credentials")]
    InvalidPort(String),

    #[error("database unreachable: {0}")]
    Unreachable(#[from] sqlx::Error),
}

/// Build a lazily-connecting pool from a credential mapping.
///
/// Connection parameters are passed as typed options, never interpolated
/// into a URL, so credentials need no escaping. Construction succeeding
/// does not imply the server is reachable; see [`check`].
pub fn build_pool(
    creds: &crate::credentials::CredentialSet,
) -> Result<PgPool, ConnectionError> {
    match creds.database_type.as_str() {
        "postgresql" | "postgres" => {},
        other => return Err(ConnectionError::UnsupportedDatabase(other.to_string())),
    }

    let port: u16 = creds
        .port
        .parse()
        .map_err(|_| ConnectionError::InvalidPort(creds.port.clone()))?;

    debug!(driver = %creds.driver, host = %creds.host, port, "Building connection pool");

    let options = PgConnectOptions::new()
        .host(&creds.host)
        .port(port)
        .username(&creds.user)
        .password(&creds.password)
        .database(&creds.database);

    // The whole load loop runs sequentially over one shared connection.
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect_lazy_with(options);

    Ok(pool)
}

/// Open and release one connection to prove the target is reachable.
pub async fn check(pool: &PgPool) -> Result<(), ConnectionError> {
    let conn = pool.acquire().await?;
    drop(conn);
    Ok(())
}
