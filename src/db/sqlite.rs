//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite databases using sqlx.

use crate::config::DatabaseConfig;
use crate::db::{Column, ColumnInfo, DatabaseClient, ResultSet, Row, Schema, Table, Value};
use crate::error::{Result, SqlReportError};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{Column as SqlxColumn, Connection, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Table that records applied migrations; hidden from the oracle.
pub(crate) const SCHEMA_VERSIONS_TABLE: &str = "schema_versions";

/// Virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

/// SQLITE_INTERRUPT
const INTERRUPTED_CODE: &str = "9";

/// SQLite database client.
///
/// Holds two pools on the same file: `pool` for writes and bookkeeping, and
/// `reader`, whose connections run with `PRAGMA query_only`.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
    reader: SqlitePool,
    query_timeout: Duration,
}

impl SqliteClient {
    /// Opens (creating if missing) the database file at `path`.
    pub async fn open(path: &Path, config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let open_error = |e: sqlx::Error| {
            SqlReportError::config(format!("Failed to open database {}: {e}", path.display()))
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options.clone())
            .await
            .map_err(open_error)?;

        let reader = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options.pragma("query_only", "ON"))
            .await
            .map_err(open_error)?;

        debug!(path = %path.display(), "Opened SQLite database");

        Ok(Self {
            pool,
            reader,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    /// Overrides the query deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs `sql` on a connection from `pool` under the query deadline.
    ///
    /// The deadline is enforced inside SQLite by a progress handler, so a
    /// runaway statement is interrupted and its connection freed instead of
    /// running on after the caller gives up.
    async fn run_with_deadline(&self, pool: &SqlitePool, sql: &str) -> Result<ResultSet> {
        let start = Instant::now();
        let deadline = start + self.query_timeout;

        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to acquire connection: {e}")))?;
        conn.lock_handle()
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to lock connection: {e}")))?
            .set_progress_handler(PROGRESS_STEPS, move || Instant::now() < deadline);

        let outcome = fetch_in_transaction(&mut conn, sql).await;

        let cleared = match conn.lock_handle().await {
            Ok(mut handle) => {
                handle.remove_progress_handler();
                Ok(())
            }
            Err(e) => Err(e),
        };
        match cleared {
            Ok(()) => {}
            Err(e) => {
                warn!("Could not clear progress handler, discarding connection: {e}");
                conn.close_on_drop();
            }
        }

        let (columns, rows) = outcome.map_err(|e| {
            if is_interrupted(&e) {
                SqlReportError::QueryTimeout(self.query_timeout)
            } else {
                SqlReportError::query(format_query_error(e))
            }
        })?;

        Ok(ResultSet {
            columns,
            rows: rows.iter().map(convert_row).collect(),
            execution_time: start.elapsed(),
        })
    }
}

/// Runs `sql` in a transaction, committing on success. Dropping the
/// transaction on error rolls it back.
async fn fetch_in_transaction(
    conn: &mut SqliteConnection,
    sql: &str,
) -> std::result::Result<(Vec<ColumnInfo>, Vec<SqliteRow>), sqlx::Error> {
    let mut tx = conn.begin().await?;
    let rows = sqlx::query(sql).fetch_all(&mut *tx).await?;

    let columns: Vec<ColumnInfo> = match rows.first() {
        Some(first_row) => first_row
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        // Zero rows: ask SQLite to describe the statement instead.
        None => match (&mut *tx).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {e}");
                Vec::new()
            }
        },
    };

    tx.commit().await?;
    Ok((columns, rows))
}

fn is_interrupted(error: &sqlx::Error) -> bool {
    error.as_database_error().is_some_and(|db_error| {
        db_error.code().is_some_and(|code| code == INTERRUPTED_CODE)
            || db_error.message().contains("interrupted")
    })
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?
            ORDER BY name
            "#,
        )
        .bind(SCHEMA_VERSIONS_TABLE)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlReportError::query(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let pragma = format!("PRAGMA table_info(\"{}\")", name.replace('"', "\"\""));
            let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
                sqlx::query_as(&pragma)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| {
                        SqlReportError::query(format!("Failed to fetch columns for {name}: {e}"))
                    })?;

            let mut table = Table::new(name);
            for (_cid, column, data_type, not_null, _default, pk) in rows {
                if pk > 0 {
                    table.primary_key.push(column.clone());
                }
                table
                    .columns
                    .push(Column::new(column, data_type).nullable(not_null == 0));
            }
            tables.push(table);
        }

        Ok(Schema { tables })
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        self.run_with_deadline(&self.pool, sql).await
    }

    async fn execute_read_only(&self, sql: &str) -> Result<ResultSet> {
        self.run_with_deadline(&self.reader, sql).await
    }

    async fn close(&self) -> Result<()> {
        self.reader.close().await;
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value using the value's storage class.
///
/// SQLite is dynamically typed, so the declared column type says little about
/// expression columns such as `MAX(salary)`.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    let decoded = match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get::<i64, _>(index).ok().map(Value::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(index).ok().map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).ok().map(Value::Bytes),
        _ => row.try_get::<String, _>(index).ok().map(Value::String),
    };

    decoded
        .or_else(|| row.try_get::<i64, _>(index).ok().map(Value::Int))
        .or_else(|| row.try_get::<f64, _>(index).ok().map(Value::Float))
        .or_else(|| row.try_get::<String, _>(index).ok().map(Value::String))
        .or_else(|| row.try_get::<Vec<u8>, _>(index).ok().map(Value::Bytes))
        .unwrap_or(Value::Null)
}

/// Formats a query error, carrying the underlying database message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("{} (code {})", db_error.message(), code),
            None => db_error.message().to_string(),
        },
        None => error.to_string(),
    }
}
