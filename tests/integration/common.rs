//! Shared fixtures for integration tests.

use sqlreport::config::DatabaseConfig;
use sqlreport::store::{Employee, EmployeeStore};
use tempfile::TempDir;

/// Opens a store in a fresh temporary directory.
pub async fn temp_store() -> (EmployeeStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = EmployeeStore::open(&dir.path().join("employees.db"), &DatabaseConfig::default())
        .await
        .unwrap();
    (store, dir)
}

/// Alice earns 99999; nine colleagues earn less.
pub async fn seed_alice_and_nine(store: &EmployeeStore) {
    store
        .insert(&Employee::new(1, "Alice", "Eng", 99_999.0))
        .await
        .unwrap();
    for id in 2..=10 {
        store
            .insert(&Employee::new(
                id,
                format!("Employee {id}"),
                if id % 2 == 0 { "Ops" } else { "Sales" },
                40_000.0 + id as f64,
            ))
            .await
            .unwrap();
    }
}
