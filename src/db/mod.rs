//! Database abstraction layer for sqlreport.
//!
//! Provides a trait-based interface for database operations so the query
//! executor can be driven by the SQLite client or a test double.

mod schema;
mod sqlite;
mod types;

pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub(crate) use sqlite::SCHEMA_VERSIONS_TABLE;
pub use types::{ColumnInfo, ResultSet, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with SqlReportError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the user tables, returning table and column information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a single SQL statement inside a transaction and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<ResultSet>;

    /// Like `execute_query`, but on a connection that refuses every write.
    async fn execute_read_only(&self, sql: &str) -> Result<ResultSet>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
