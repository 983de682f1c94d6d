//! Report writer integration tests.
//!
//! Writes real query results and reads them back.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqlreport::error::SqlReportError;
use sqlreport::query::QueryExecutor;
use sqlreport::report::{csv_field, read_report, ReportWriter};
use sqlreport::store::Employee;

use super::common::temp_store;

#[tokio::test]
async fn test_query_result_round_trips_through_csv() {
    let (store, dir) = temp_store().await;
    store
        .insert(&Employee::new(1, "O'Brien, \"Pat\"", "R&D\nLab", 55_000.5))
        .await
        .unwrap();
    store
        .insert(&Employee::new(2, "Zoë", "Eng", 60_000.0))
        .await
        .unwrap();
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));
    let result = executor
        .execute("SELECT id, name, dept, salary FROM Employee ORDER BY id")
        .await
        .unwrap();
    let path = dir.path().join("round_trip.csv");

    ReportWriter::new().write(&path, &result).await.unwrap();
    let report = read_report(&path).unwrap();

    assert_eq!(report.columns, vec!["id", "name", "dept", "salary"]);
    let expected: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(csv_field).collect())
        .collect();
    assert_eq!(report.rows, expected);
    assert_eq!(report.rows[0][1], "O'Brien, \"Pat\"");
    assert_eq!(report.rows[0][2], "R&D\nLab");
    assert_eq!(report.rows[1][1], "Zoë");
}

#[tokio::test]
async fn test_second_request_overwrites_not_appends() {
    let (store, dir) = temp_store().await;
    store.generate_fixtures(20).await.unwrap();
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));
    let writer = ReportWriter::new();
    let path = dir.path().join("same.csv");

    let many = executor.execute("SELECT id FROM Employee").await.unwrap();
    writer.write(&path, &many).await.unwrap();
    let one = executor
        .execute("SELECT name FROM Employee WHERE id = 1")
        .await
        .unwrap();
    writer.write(&path, &one).await.unwrap();

    let report = read_report(&path).unwrap();
    assert_eq!(report.columns, vec!["name"]);
    assert_eq!(report.rows.len(), 1);
}

#[tokio::test]
async fn test_unwritable_path_is_io_failure() {
    let (store, dir) = temp_store().await;
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));
    let result = executor.execute("SELECT 1 AS one").await.unwrap();

    let err = ReportWriter::new()
        .write(&dir.path().join("no/such/dir/out.csv"), &result)
        .await
        .unwrap_err();

    assert!(matches!(err, SqlReportError::Io(_)));
    assert_eq!(err.category(), "I/O Error");
}

#[tokio::test]
async fn test_large_result_is_written_in_full() {
    let (store, dir) = temp_store().await;
    store.generate_fixtures(1500).await.unwrap();
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));
    let result = executor.execute("SELECT id FROM Employee ORDER BY id").await.unwrap();
    let path = dir.path().join("large.csv");

    ReportWriter::new().write(&path, &result).await.unwrap();

    let report = read_report(&path).unwrap();
    assert_eq!(report.rows.len(), 1500);
    assert_eq!(report.rows.last().unwrap(), &vec!["1500".to_string()]);
}
