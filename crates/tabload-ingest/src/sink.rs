//! Table sinks: write a parsed row set to a named table
//!
//! The driver talks to storage through the narrow [`TableSink`] interface
//! so tests can substitute a recording fake for the PostgreSQL-backed
//! implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::loader::{Column, ColumnType, LoadError, RowSet};
use tabload_common::types::{LoadMode, TableName};

/// Upper bound on rows per INSERT statement.
const DEFAULT_INSERT_CHUNK_ROWS: usize = 1000;

/// PostgreSQL protocol limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Destination for parsed row sets.
///
/// One sink is shared across the whole load loop and closed exactly once
/// when the loop exits.
#[async_trait]
pub trait TableSink: Send {
    /// Write `rows` to `table` under `mode`; returns the row count written.
    async fn write(
        &mut self,
        table: &TableName,
        rows: &RowSet,
        mode: LoadMode,
    ) -> Result<u64, LoadError>;

    /// Release the underlying resources.
    async fn close(&mut self);
}

/// PostgreSQL-backed sink.
///
/// Each file is written in one transaction: Replace mode drops and
/// recreates the table, Append creates it if absent; rows then go in as
/// chunked multi-row INSERTs with binds typed per inferred column type.
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn chunk_rows(column_count: usize) -> usize {
        (MAX_BIND_PARAMS / column_count.max(1)).min(DEFAULT_INSERT_CHUNK_ROWS)
    }
}

#[async_trait]
impl TableSink for PgSink {
    async fn write(
        &mut self,
        table: &TableName,
        rows: &RowSet,
        mode: LoadMode,
    ) -> Result<u64, LoadError> {
        let write_err = |e: sqlx::Error| LoadError::Write {
            table: table.to_string(),
            reason: e.to_string(),
        };

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        match mode {
            LoadMode::Replace => {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.quoted()))
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err)?;
                sqlx::query(&create_table_sql(table, &rows.columns, false))
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err)?;
            },
            LoadMode::Append => {
                sqlx::query(&create_table_sql(table, &rows.columns, true))
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err)?;
            },
        }

        let column_list = rows
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        for chunk in rows.rows.chunks(Self::chunk_rows(rows.columns.len())) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                table.quoted(),
                column_list
            ));

            builder.push_values(chunk, |mut b, row| {
                for (cell, column) in row.iter().zip(&rows.columns) {
                    match column.ty {
                        ColumnType::BigInt => {
                            b.push_bind(cell.as_deref().and_then(|v| v.parse::<i64>().ok()));
                        },
                        ColumnType::Double => {
                            b.push_bind(cell.as_deref().and_then(|v| v.parse::<f64>().ok()));
                        },
                        ColumnType::Text => {
                            b.push_bind(cell.clone());
                        },
                    }
                }
            });

            builder.build().execute(&mut *tx).await.map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;

        info!(table = %table, rows = rows.row_count(), %mode, "Table written");
        Ok(rows.row_count())
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

/// Double-quote an identifier, escaping embedded quotes. Column names come
/// straight from CSV headers and can contain anything.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &TableName, columns: &[Column], if_not_exists: bool) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql()))
        .collect::<Vec<_>>()
        .join(", ");

    let clause = if if_not_exists { "IF NOT EXISTS " } else { "" };
    format!("CREATE TABLE {}{} ({})", clause, table.quoted(), cols)
}
