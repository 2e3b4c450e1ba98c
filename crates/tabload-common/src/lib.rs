//! Tabload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the tabload workspace.
//!
//! # Overview
//!
//! This crate provides functionality used across all tabload workspace
//! members:
//!
//! - **Logging**: Centralized tracing configuration and initialization
//! - **Types**: Table names, load modes, and per-run reporting structures
//!
//! # Example
//!
//! ```no_run
//! use tabload_common::types::{RunReport, FileOutcome, LoadResult};
//!
//! let mut report = RunReport::new();
//! report.record(FileOutcome {
//!     file: "orders.csv".to_string(),
//!     table: "orders".to_string(),
//!     result: LoadResult::Loaded { rows: 3 },
//! });
//! assert_eq!(report.loaded, 1);
//! ```

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{FileOutcome, LoadMode, LoadResult, RunReport, TableName};
