//! Schema versioning and migrations for the employee database.
//!
//! Manages database schema evolution with forward-only migrations. Every
//! migration is idempotent so two processes racing on a fresh file converge.

use crate::db::SCHEMA_VERSIONS_TABLE;
use crate::error::{Result, SqlReportError};
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tracing::info;

pub(crate) const CURRENT_VERSION: i64 = 1;

/// Runs all pending migrations on the database. Never drops or truncates data.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| SqlReportError::query(format!("Failed to begin migration: {e}")))?;

    ensure_schema_versions_table(&mut tx).await?;

    let current = get_current_version(&mut tx).await?;

    if current > CURRENT_VERSION {
        return Err(SqlReportError::config(format!(
            "Database schema version ({}) is newer than supported version ({}). \
             Please upgrade sqlreport to the latest version.",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        info!(
            "Migrating employee database from version {} to {}",
            current, CURRENT_VERSION
        );
        for version in (current + 1)..=CURRENT_VERSION {
            run_migration(&mut tx, version).await?;
            record_version(&mut tx, version).await?;
            info!("Applied migration v{}", version);
        }
    }

    tx.commit()
        .await
        .map_err(|e| SqlReportError::query(format!("Failed to commit migration: {e}")))
}

/// Ensures the schema_versions table exists.
async fn ensure_schema_versions_table(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {SCHEMA_VERSIONS_TABLE} (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#
    );
    sqlx::query(&ddl)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            SqlReportError::query(format!("Failed to create schema_versions table: {e}"))
        })?;

    Ok(())
}

/// Gets the current schema version (0 for a fresh database).
pub(crate) async fn get_current_version(tx: &mut Transaction<'_, Sqlite>) -> Result<i64> {
    let (version,): (Option<i64>,) =
        sqlx::query_as(&format!("SELECT MAX(version) FROM {SCHEMA_VERSIONS_TABLE}"))
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| SqlReportError::query(format!("Failed to get schema version: {e}")))?;

    Ok(version.unwrap_or(0))
}

/// Records a completed migration version.
async fn record_version(tx: &mut Transaction<'_, Sqlite>, version: i64) -> Result<()> {
    sqlx::query(&format!(
        "INSERT OR IGNORE INTO {SCHEMA_VERSIONS_TABLE} (version) VALUES (?)"
    ))
    .bind(version)
    .execute(&mut **tx)
    .await
    .map_err(|e| SqlReportError::query(format!("Failed to record migration: {e}")))?;
    Ok(())
}

/// Runs a specific migration version.
async fn run_migration(tx: &mut Transaction<'_, Sqlite>, version: i64) -> Result<()> {
    match version {
        1 => migration_v1(tx).await,
        _ => Err(SqlReportError::internal(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: the Employee table.
async fn migration_v1(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Employee (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            dept TEXT NOT NULL,
            salary REAL NOT NULL
        )
        "#,
    )
    .execute(&mut **tx)
    .await
    .map_err(|e| SqlReportError::query(format!("Failed to create Employee table: {e}")))?;

    Ok(())
}
