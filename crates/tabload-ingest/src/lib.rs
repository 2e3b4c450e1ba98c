//! Tabload Ingest Library
//!
//! The bulk CSV-ingestion pipeline: fetch a remote zip archive, extract it,
//! and load each contained CSV file into a PostgreSQL table named after the
//! file stem.
//!
//! # Pipeline
//!
//! - **fetch**: download the archive, validate it, extract it to disk
//! - **credentials**: read the database credential mapping from a YAML file
//! - **connect**: build a lazily-connecting PostgreSQL pool
//! - **loader**: parse one CSV into typed rows
//! - **sink**: write typed rows to a table (replace or append)
//! - **driver**: orchestrate the above and report per-file outcomes
//!
//! # Example
//!
//! ```no_run
//! use tabload_ingest::driver::{run, RunRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let request = RunRequest::new(
//!         "https://example.com/data.zip",
//!         "./extracted",
//!         "product_data_analyst_data_2024",
//!         "./db_creds.yaml",
//!     );
//!     let report = run(&request).await?;
//!     println!("{} of {} files loaded", report.loaded, report.attempted);
//!     Ok(())
//! }
//! ```

pub mod connect;
pub mod credentials;
pub mod driver;
pub mod fetch;
pub mod loader;
pub mod sink;

// Re-export commonly used types
pub use connect::ConnectionError;
pub use credentials::{ConfigError, CredentialSet};
pub use driver::{RunError, RunRequest};
pub use fetch::{FetchConfig, FetchError};
pub use loader::LoadError;
pub use sink::{PgSink, TableSink};
