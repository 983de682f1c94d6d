//! Query execution integration tests.
//!
//! Runs SQL through the read-only gate against a seeded employee table.

use std::sync::Arc;

use sqlreport::db::{DatabaseClient, Value};
use sqlreport::error::SqlReportError;
use sqlreport::query::QueryExecutor;

use super::common::{seed_alice_and_nine, temp_store};

#[tokio::test]
async fn test_projection_width_matches_select_list() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));

    let cases = [
        ("SELECT name FROM Employee", 1),
        ("SELECT id, name FROM Employee", 2),
        ("SELECT * FROM Employee", 4),
        ("SELECT dept, COUNT(*), AVG(salary) FROM Employee GROUP BY dept", 3),
    ];

    for (sql, width) in cases {
        let result = executor.execute(sql).await.unwrap();
        assert_eq!(result.columns.len(), width, "{sql}");
        assert!(result.rows.iter().all(|row| row.len() == width), "{sql}");
    }
}

#[tokio::test]
async fn test_zero_rows_keep_column_names() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));

    let result = executor
        .execute("SELECT name, salary FROM Employee WHERE salary > 1000000")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["name", "salary"]);
}

#[tokio::test]
async fn test_values_are_typed() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));

    let result = executor
        .execute("SELECT id, name, salary FROM Employee WHERE id = 1")
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![vec![
            Value::Int(1),
            Value::String("Alice".to_string()),
            Value::Float(99_999.0)
        ]]
    );
}

#[tokio::test]
async fn test_drop_table_rejected_table_intact() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor =
        QueryExecutor::new(Arc::new(store.client().clone())).with_mutation_allowed(true);

    for sql in [
        "DROP TABLE Employee",
        "DELETE FROM Employee",
        "ALTER TABLE Employee ADD COLUMN x INTEGER",
        "SELECT 1; DROP TABLE Employee",
        "PRAGMA writable_schema = 1",
    ] {
        let err = executor.execute(sql).await.unwrap_err();
        assert!(matches!(err, SqlReportError::Query(_)), "{sql}");
    }

    assert_eq!(store.count().await.unwrap(), 10);
    let schema = store.client().introspect_schema().await.unwrap();
    assert_eq!(schema.table("Employee").unwrap().columns.len(), 4);
}

#[tokio::test]
async fn test_data_modifying_cte_is_rejected() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor = QueryExecutor::new(Arc::new(store.client().clone()));

    let result = executor
        .execute("WITH gone AS (DELETE FROM Employee RETURNING id) SELECT * FROM gone")
        .await;

    assert!(result.is_err());
    assert_eq!(store.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_insert_with_opt_in() {
    let (store, _dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let executor =
        QueryExecutor::new(Arc::new(store.client().clone())).with_mutation_allowed(true);

    executor
        .execute("INSERT INTO Employee (id, name, dept, salary) VALUES (11, 'Zed', 'Ops', 5)")
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 11);
}
