//! Table loading: parse one CSV file into a typed in-memory row set
//!
//! No schema is supplied with the data. Column types are inferred from the
//! textual values: a column whose non-empty values all parse as integers
//! becomes BIGINT, one whose values all parse as floats becomes DOUBLE
//! PRECISION, everything else is TEXT. Empty cells load as NULL.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::sink::TableSink;
use tabload_common::types::{LoadMode, TableName};

/// Errors from loading one tabular file. Per-file failures are isolated by
/// the driver; they never abort the rest of the run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("failed to write table '{table}': {reason}")]
    Write { table: String, reason: String },
}

/// SQL column type inferred from textual values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Text,
}

impl ColumnType {
    /// The PostgreSQL type name for CREATE TABLE.
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// The parse result of one CSV file: ordered columns plus rows of optional
/// string cells (`None` = empty cell = NULL).
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    /// Data rows, header excluded.
    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }
}

/// Parse the CSV at `path` and infer each column's type.
///
/// The first record is the header. Ragged rows and files without a header
/// are parse errors.
pub fn read_rows(path: &Path) -> Result<RowSet, LoadError> {
    let parse_err = |reason: String| LoadError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| parse_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_err(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(parse_err("no columns to parse".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_err(e.to_string()))?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    let columns = infer_columns(&headers, &rows);
    debug!(
        path = %path.display(),
        columns = columns.len(),
        rows = rows.len(),
        "Parsed tabular file"
    );

    Ok(RowSet { columns, rows })
}

/// Infer one type per column from the non-empty values.
fn infer_columns(headers: &[String], rows: &[Vec<Option<String>>]) -> Vec<Column> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| Column {
            name: name.clone(),
            ty: infer_type(rows.iter().filter_map(|row| row[idx].as_deref())),
        })
        .collect()
}

fn infer_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut all_int = true;
    let mut all_float = true;
    let mut seen_any = false;

    for value in values {
        seen_any = true;
        if all_int && value.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && value.parse::<f64>().is_err() {
            all_float = false;
        }
        if !all_int && !all_float {
            return ColumnType::Text;
        }
    }

    match (seen_any, all_int, all_float) {
        (false, _, _) => ColumnType::Text,
        (true, true, _) => ColumnType::BigInt,
        (true, false, true) => ColumnType::Double,
        _ => ColumnType::Text,
    }
}

/// Parse the file at `path` and write it to `table` through `sink`.
///
/// Returns the number of rows written, header excluded.
pub async fn load_file<S: TableSink + Send>(
    path: &Path,
    table: &TableName,
    sink: &mut S,
    mode: LoadMode,
) -> Result<u64, LoadError> {
    let rows = read_rows(path)?;
    sink.write(table, &rows, mode).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_rows_and_headers() {
        let file = write_csv("id,amount\n1,9.99\n2,14.50\n3,3.00\n");
        let rows = read_rows(file.path()).unwrap();

        assert_eq!(rows.row_count(), 3);
        assert_eq!(rows.columns[0].name, "id");
        assert_eq!(rows.columns[1].name, "amount");
        assert_eq!(rows.rows[0][1].as_deref(), Some("9.99"));
    }

    #[test]
    fn test_infers_scenario_column_types() {
        // orders.csv from the two-table scenario: integer ids, float amounts
        let orders = write_csv("id,amount\n1,9.99\n2,14.50\n3,3.00\n");
        let rows = read_rows(orders.path()).unwrap();
        assert_eq!(rows.columns[0].ty, ColumnType::BigInt);
        assert_eq!(rows.columns[1].ty, ColumnType::Double);

        // customers.csv: integer ids, textual names
        let customers = write_csv("id,name\n1,Ada\n2,Grace\n");
        let rows = read_rows(customers.path()).unwrap();
        assert_eq!(rows.columns[0].ty, ColumnType::BigInt);
        assert_eq!(rows.columns[1].ty, ColumnType::Text);
    }

    #[test]
    fn test_integer_valued_column_stays_integer() {
        let file = write_csv("qty\n1\n2\n30\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.columns[0].ty, ColumnType::BigInt);
    }

    #[test]
    fn test_mixed_int_and_float_becomes_double() {
        let file = write_csv("price\n1\n2.5\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.columns[0].ty, ColumnType::Double);
    }

    #[test]
    fn test_empty_cells_are_null_and_ignored_for_inference() {
        let file = write_csv("id,score\n1,\n2,7\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.columns[1].ty, ColumnType::BigInt);
        assert_eq!(rows.rows[0][1], None);
        assert_eq!(rows.rows[1][1].as_deref(), Some("7"));
    }

    #[test]
    fn test_all_empty_column_is_text() {
        let file = write_csv("id,notes\n1,\n2,\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.columns[1].ty, ColumnType::Text);
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let file = write_csv("id,name\n1,Ada\n2\n");
        let err = read_rows(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let file = write_csv("");
        let err = read_rows(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let err = read_rows(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
