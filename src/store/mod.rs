//! Schema & fixture store.
//!
//! Owns the `Employee` table: schema creation behind a run-once gate,
//! transactional inserts, and synthetic data generation for demos.

mod fixtures;
mod migrations;

use fixtures::fake_employees;

use crate::config::DatabaseConfig;
use crate::db::{DatabaseClient, Schema, SqliteClient};
use crate::error::{Result, SqlReportError};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// One row of the `Employee` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Employee {
    /// Unique, immutable identifier.
    pub id: i64,
    pub name: String,
    pub dept: String,
    pub salary: f64,
}

impl Employee {
    /// Creates a record.
    pub fn new(id: i64, name: impl Into<String>, dept: impl Into<String>, salary: f64) -> Self {
        Self {
            id,
            name: name.into(),
            dept: dept.into(),
            salary,
        }
    }
}

/// Store for the employee table.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct EmployeeStore {
    client: SqliteClient,
    schema_ready: OnceCell<()>,
    write_lock: Mutex<()>,
}

impl EmployeeStore {
    /// Wraps an already opened client.
    pub fn new(client: SqliteClient) -> Self {
        Self {
            client,
            schema_ready: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the database at `path` and ensures the schema exists.
    pub async fn open(path: &Path, config: &DatabaseConfig) -> Result<Self> {
        let store = Self::new(SqliteClient::open(path, config).await?);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Returns the database client, for read queries.
    pub fn client(&self) -> &SqliteClient {
        &self.client
    }

    /// Creates the table if absent. Idempotent; concurrent callers wait on
    /// the first one instead of interleaving DDL.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                migrations::run_migrations(self.client.pool()).await?;
                debug!("Employee schema ready");
                Ok::<(), SqlReportError>(())
            })
            .await?;
        Ok(())
    }

    /// Inserts one record in its own transaction.
    ///
    /// Fails with `ConstraintViolation` if the identifier already exists.
    pub async fn insert(&self, employee: &Employee) -> Result<()> {
        self.ensure_schema().await?;
        let _guard = self.write_lock.lock().await;

        let mut tx = self.begin().await?;
        insert_in(&mut tx, employee).await?;
        commit(tx).await
    }

    /// Inserts `count` synthetic records with sequential identifiers.
    ///
    /// Identifiers start at 1 on an empty table and after the current maximum
    /// otherwise. All records are inserted in one transaction.
    pub async fn generate_fixtures(&self, count: usize) -> Result<Vec<Employee>> {
        self.ensure_schema().await?;
        let _guard = self.write_lock.lock().await;

        let mut tx = self.begin().await?;
        let (max_id,): (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM Employee")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to read max id: {e}")))?;

        let employees = fake_employees(max_id.unwrap_or(0) + 1, count);
        for employee in &employees {
            insert_in(&mut tx, employee).await?;
        }
        commit(tx).await?;

        info!(count, first_id = employees.first().map(|e| e.id), "Generated fixtures");
        Ok(employees)
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> Result<i64> {
        self.ensure_schema().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Employee")
            .fetch_one(self.client.pool())
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to count employees: {e}")))?;
        Ok(count)
    }

    /// Highest identifier in use, if any.
    pub async fn max_id(&self) -> Result<Option<i64>> {
        self.ensure_schema().await?;
        let (max_id,): (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM Employee")
            .fetch_one(self.client.pool())
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to read max id: {e}")))?;
        Ok(max_id)
    }

    /// User tables and columns, as shown to the oracle.
    pub async fn schema(&self) -> Result<Schema> {
        self.ensure_schema().await?;
        self.client.introspect_schema().await
    }

    /// All records ordered by identifier.
    pub async fn all(&self) -> Result<Vec<Employee>> {
        self.ensure_schema().await?;
        sqlx::query_as::<_, Employee>("SELECT id, name, dept, salary FROM Employee ORDER BY id")
            .fetch_all(self.client.pool())
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to list employees: {e}")))
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.client
            .pool()
            .begin()
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to begin transaction: {e}")))
    }
}

async fn insert_in(tx: &mut Transaction<'_, Sqlite>, employee: &Employee) -> Result<()> {
    sqlx::query("INSERT INTO Employee (id, name, dept, salary) VALUES (?, ?, ?, ?)")
        .bind(employee.id)
        .bind(&employee.name)
        .bind(&employee.dept)
        .bind(employee.salary)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => SqlReportError::constraint(
                format!("employee id {} already exists", employee.id),
            ),
            _ => SqlReportError::query(format!("Failed to insert employee {}: {e}", employee.id)),
        })?;
    Ok(())
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| SqlReportError::query(format!("Failed to commit transaction: {e}")))
}
