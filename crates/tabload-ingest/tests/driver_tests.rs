//! Driver tests: per-file fault isolation, sink lifetime, file discovery

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tabload_common::types::{LoadMode, LoadResult, TableName};
use tabload_ingest::driver::{discover_files, load_files, run, RunError, RunRequest};
use tabload_ingest::loader::{LoadError, RowSet};
use tabload_ingest::sink::TableSink;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory sink that records writes and close calls, optionally failing
/// on one table to exercise fault isolation.
struct RecordingSink {
    writes: Vec<(String, u64)>,
    close_count: usize,
    fail_on: Option<String>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            writes: Vec::new(),
            close_count: 0,
            fail_on: None,
        }
    }

    fn failing_on(table: &str) -> Self {
        Self {
            fail_on: Some(table.to_string()),
            ..Self::new()
        }
    }
}

#[async_trait]
impl TableSink for RecordingSink {
    async fn write(
        &mut self,
        table: &TableName,
        rows: &RowSet,
        _mode: LoadMode,
    ) -> Result<u64, LoadError> {
        if self.fail_on.as_deref() == Some(table.as_str()) {
            return Err(LoadError::Write {
                table: table.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.writes.push((table.to_string(), rows.row_count()));
        Ok(rows.row_count())
    }

    async fn close(&mut self) {
        self.close_count += 1;
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

#[tokio::test]
async fn loads_every_file_and_closes_once() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.csv", "id\n1\n2\n");
    write_file(dir.path(), "b.csv", "id\n1\n");
    write_file(dir.path(), "c.csv", "id\n1\n2\n3\n");

    let files = discover_files(dir.path()).unwrap();
    let mut sink = RecordingSink::new();
    let report = load_files(&files, &mut sink, LoadMode::Replace).await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.loaded, 3);
    assert_eq!(report.failed, 0);
    assert!(report.is_success());
    assert_eq!(
        sink.writes,
        vec![
            ("a".to_string(), 2),
            ("b".to_string(), 1),
            ("c".to_string(), 3)
        ]
    );
    assert_eq!(sink.close_count, 1);
}

#[tokio::test]
async fn write_failure_is_isolated_and_sink_still_closes_once() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.csv", "id\n1\n");
    write_file(dir.path(), "b.csv", "id\n1\n2\n");
    write_file(dir.path(), "c.csv", "id\n1\n");

    let files = discover_files(dir.path()).unwrap();
    let mut sink = RecordingSink::failing_on("b");
    let report = load_files(&files, &mut sink, LoadMode::Replace).await;

    // The failing middle file does not stop its neighbours
    assert_eq!(report.attempted, 3);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        sink.writes,
        vec![("a".to_string(), 1), ("c".to_string(), 1)]
    );
    assert_eq!(sink.close_count, 1);

    let failed = &report.outcomes[1];
    assert_eq!(failed.file, "b.csv");
    assert!(matches!(&failed.result, LoadResult::Failed { reason } if reason.contains("injected")));
}

#[tokio::test]
async fn parse_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.csv", "id,name\n1,Ada\n2\n");
    write_file(dir.path(), "good.csv", "id\n1\n");

    let files = discover_files(dir.path()).unwrap();
    let mut sink = RecordingSink::new();
    let report = load_files(&files, &mut sink, LoadMode::Replace).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.failed, 1);
    // Only the parseable file reached the sink
    assert_eq!(sink.writes, vec![("good".to_string(), 1)]);
    assert_eq!(sink.close_count, 1);
}

#[tokio::test]
async fn unusable_file_stem_is_a_per_file_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "2024-orders.csv", "id\n1\n");
    write_file(dir.path(), "orders.csv", "id\n1\n");

    let files = discover_files(dir.path()).unwrap();
    let mut sink = RecordingSink::new();
    let report = load_files(&files, &mut sink, LoadMode::Replace).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(sink.writes, vec![("orders".to_string(), 1)]);

    let rejected = &report.outcomes[0];
    assert_eq!(rejected.file, "2024-orders.csv");
    assert!(matches!(&rejected.result, LoadResult::Failed { .. }));
}

#[tokio::test]
async fn empty_directory_closes_sink_and_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let files = discover_files(dir.path()).unwrap();
    assert!(files.is_empty());

    let mut sink = RecordingSink::new();
    let report = load_files(&files, &mut sink, LoadMode::Replace).await;
    assert_eq!(report.attempted, 0);
    assert!(report.is_success());
    assert_eq!(sink.close_count, 1);
}

#[test]
fn discovery_is_non_recursive_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "zeta.csv", "id\n");
    write_file(dir.path(), "alpha.csv", "id\n");
    write_file(dir.path(), "readme.txt", "not tabular");
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_file(&dir.path().join("nested"), "inner.csv", "id\n");

    let files = discover_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["alpha.csv", "zeta.csv"]);
}

#[tokio::test]
async fn missing_subdirectory_fails_before_credentials_are_touched() {
    let server = MockServer::start().await;
    // Valid archive, but without the expected subdirectory
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file("elsewhere/data.csv", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"id\n1\n").unwrap();
        writer.finish().unwrap();
    }
    Mock::given(method("GET"))
        .and(path("/archive.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(cursor.into_inner()))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let request = RunRequest::new(
        format!("{}/archive.zip", server.uri()),
        dest.path(),
        "expected_data",
        // Deliberately nonexistent: reaching the credential step would
        // surface ConfigError instead of DirectoryMissing
        "/nonexistent/creds.yaml",
    );

    let err = run(&request).await.unwrap_err();
    assert!(matches!(err, RunError::DirectoryMissing(_)));
}
