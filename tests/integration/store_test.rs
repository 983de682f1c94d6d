//! Schema & fixture store integration tests.

use sqlreport::config::DatabaseConfig;
use sqlreport::error::SqlReportError;
use sqlreport::store::{Employee, EmployeeStore};

use super::common::temp_store;

#[tokio::test]
async fn test_reopening_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");

    {
        let store = EmployeeStore::open(&path, &DatabaseConfig::default())
            .await
            .unwrap();
        store.generate_fixtures(7).await.unwrap();
        store.client().pool().close().await;
    }

    let store = EmployeeStore::open(&path, &DatabaseConfig::default())
        .await
        .unwrap();
    store.ensure_schema().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 7);
}

#[tokio::test]
async fn test_fixtures_are_plausible_and_strictly_increasing() {
    let (store, _dir) = temp_store().await;

    store.generate_fixtures(100).await.unwrap();
    let employees = store.all().await.unwrap();

    assert_eq!(employees.len(), 100);
    assert!(employees.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(employees.first().map(|e| e.id), Some(1));
    assert_eq!(employees.last().map(|e| e.id), Some(100));
    for employee in &employees {
        assert!(!employee.name.is_empty());
        assert!(!employee.dept.is_empty());
        assert!((10_000.0..100_000.0).contains(&employee.salary));
    }
}

#[tokio::test]
async fn test_second_batch_continues_after_first() {
    let (store, _dir) = temp_store().await;

    let first = store.generate_fixtures(5).await.unwrap();
    let second = store.generate_fixtures(5).await.unwrap();

    assert_eq!(first.last().unwrap().id + 1, second.first().unwrap().id);
    assert_eq!(store.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_zero_fixtures_is_a_no_op() {
    let (store, _dir) = temp_store().await;

    assert!(store.generate_fixtures(0).await.unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_insert_leaves_original() {
    let (store, _dir) = temp_store().await;
    store
        .insert(&Employee::new(3, "Carol", "Eng", 70_000.0))
        .await
        .unwrap();

    let err = store
        .insert(&Employee::new(3, "Mallory", "Eng", 1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, SqlReportError::ConstraintViolation(_)));
    assert_eq!(store.all().await.unwrap()[0].name, "Carol");
}
