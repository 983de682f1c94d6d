//! Query execution with safety classification.
//!
//! Every statement the oracle produces passes through here. Only a single
//! read-only statement runs by default; the database is never asked to
//! execute anything else.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::{DatabaseClient, ResultSet};
use crate::error::{Result, SqlReportError};
use crate::safety::{classify_sql, ClassificationResult, SafetyLevel};

/// Query executor that gates SQL on its classification before running it.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
    allow_mutation: bool,
}

impl QueryExecutor {
    /// Creates a read-only executor.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self {
            db,
            allow_mutation: false,
        }
    }

    /// Allows single INSERT/UPDATE statements. Destructive statements stay
    /// rejected regardless.
    pub fn with_mutation_allowed(mut self, allow: bool) -> Self {
        self.allow_mutation = allow;
        self
    }

    /// Returns true if mutating statements are accepted.
    pub fn allows_mutation(&self) -> bool {
        self.allow_mutation
    }

    /// Classifies `sql` and executes it if permitted.
    ///
    /// The database receives the parsed statement rendered back to SQL, so it
    /// runs exactly what was classified. Read-only statements also run on a
    /// connection that refuses writes.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet> {
        let classification = self.check(sql)?;
        let statement = classification
            .statement
            .as_deref()
            .ok_or_else(|| SqlReportError::internal("Classified SQL has no parsed statement"))?;
        debug!(
            statement = %classification.statement_type,
            level = %classification.level,
            sql = statement,
            "Executing query"
        );

        let result = if classification.is_single_read_only() {
            self.db.execute_read_only(statement).await?
        } else {
            self.db.execute_query(statement).await?
        };

        info!(
            rows = result.row_count(),
            columns = result.columns.len(),
            elapsed_ms = result.execution_time.as_millis() as u64,
            "Query executed"
        );
        Ok(result)
    }

    /// Returns the classification if `sql` may run, or the reason it may not.
    pub fn check(&self, sql: &str) -> Result<ClassificationResult> {
        if sql.trim().is_empty() {
            return Err(SqlReportError::query("Empty SQL statement"));
        }

        let classification = classify_sql(sql);

        if classification.statement_count > 1 || classification.statement_type.is_multiple() {
            return Err(SqlReportError::query(format!(
                "Refusing to run {} statements at once; expected a single query",
                classification.statement_count
            )));
        }

        match classification.level {
            SafetyLevel::Safe => Ok(classification),
            SafetyLevel::Mutating if self.allow_mutation => {
                warn!(statement = %classification.statement_type, "Running mutating statement");
                Ok(classification)
            }
            SafetyLevel::Mutating => Err(SqlReportError::query(format!(
                "Refusing to run {} statement: only read-only queries are allowed",
                classification.statement_type
            ))),
            SafetyLevel::Destructive => {
                let detail = classification
                    .warning
                    .as_deref()
                    .map(|w| format!(" ({w})"))
                    .unwrap_or_default();
                Err(SqlReportError::query(format!(
                    "Refusing to run destructive {} statement{detail}",
                    classification.statement_type
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::SqliteClient;
    use crate::store::{Employee, EmployeeStore};
    use tempfile::{tempdir, TempDir};

    async fn seeded() -> (QueryExecutor, EmployeeStore, TempDir) {
        let dir = tempdir().unwrap();
        let store = EmployeeStore::open(&dir.path().join("q.db"), &DatabaseConfig::default())
            .await
            .unwrap();
        store
            .insert(&Employee::new(1, "Alice", "Eng", 99_999.0))
            .await
            .unwrap();
        store
            .insert(&Employee::new(2, "Bob", "Ops", 50_000.0))
            .await
            .unwrap();
        let client: Arc<dyn DatabaseClient> = Arc::new(store.client().clone());
        (QueryExecutor::new(client), store, dir)
    }

    #[tokio::test]
    async fn test_select_runs() {
        let (executor, _store, _dir) = seeded().await;

        let result = executor
            .execute("SELECT name, salary FROM Employee WHERE dept = 'Eng'")
            .await
            .unwrap();

        assert_eq!(result.column_names(), vec!["name", "salary"]);
        assert_eq!(result.row_count(), 1);
    }

    #[tokio::test]
    async fn test_column_count_matches_projection() {
        let (executor, _store, _dir) = seeded().await;

        let result = executor
            .execute("SELECT id, name, dept, salary, salary * 2 AS doubled FROM Employee")
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 5);
        assert!(result.rows.iter().all(|row| row.len() == 5));
    }

    #[tokio::test]
    async fn test_drop_is_rejected_and_table_survives() {
        let (executor, store, _dir) = seeded().await;

        let err = executor.execute("DROP TABLE Employee").await.unwrap_err();

        assert!(matches!(err, SqlReportError::Query(_)));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_rejected_even_with_mutation_allowed() {
        let (executor, store, _dir) = seeded().await;
        let executor = executor.with_mutation_allowed(true);

        let err = executor.execute("DELETE FROM Employee").await.unwrap_err();

        assert!(err.to_string().contains("destructive"));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_requires_opt_in() {
        let (executor, store, _dir) = seeded().await;
        let sql = "UPDATE Employee SET salary = 1 WHERE id = 2";

        assert!(executor.execute(sql).await.is_err());
        assert_eq!(store.all().await.unwrap()[1].salary, 50_000.0);

        let executor = executor.with_mutation_allowed(true);
        executor.execute(sql).await.unwrap();
        assert_eq!(store.all().await.unwrap()[1].salary, 1.0);
    }

    #[tokio::test]
    async fn test_multiple_statements_rejected() {
        let (executor, store, _dir) = seeded().await;

        let err = executor
            .execute("SELECT 1; DELETE FROM Employee")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("2 statements"));
        assert_eq!(store.count().await.unwrap(), 2);

        let err = executor.execute("SELECT 1; SELECT 2").await.unwrap_err();
        assert!(matches!(err, SqlReportError::Query(_)));
    }

    #[tokio::test]
    async fn test_nested_comment_cannot_smuggle_statements() {
        let (executor, store, _dir) = seeded().await;

        let outcome = executor
            .execute("SELECT 1 /* /* */ ; DROP TABLE Employee; -- */")
            .await;

        if let Ok(result) = outcome {
            assert_eq!(result.rows, vec![vec![crate::db::Value::Int(1)]]);
        }
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_comments_are_not_sent_to_database() {
        let (executor, store, _dir) = seeded().await;

        let result = executor
            .execute("SELECT COUNT(*) AS n /* ; DELETE FROM Employee */ FROM Employee")
            .await
            .unwrap();

        assert_eq!(result.rows, vec![vec![crate::db::Value::Int(2)]]);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_sql_rejected() {
        let (executor, _store, _dir) = seeded().await;

        for sql in ["", "   \n\t"] {
            let err = executor.execute(sql).await.unwrap_err();
            assert_eq!(err.to_string(), "Query error: Empty SQL statement");
        }
    }

    #[tokio::test]
    async fn test_unparsable_sql_rejected_before_database() {
        let (executor, _store, _dir) = seeded().await;

        let err = executor.execute("SELEKT * FROM Employee").await.unwrap_err();

        assert!(err.to_string().contains("Could not parse SQL"));
    }

    #[tokio::test]
    async fn test_missing_table_reports_database_message() {
        let (executor, _store, _dir) = seeded().await;

        let err = executor.execute("SELECT * FROM Nope").await.unwrap_err();

        assert!(matches!(err, SqlReportError::Query(_)));
        assert!(err.to_string().contains("no such table"));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_query_timeout() {
        let dir = tempdir().unwrap();
        let client = SqliteClient::open(&dir.path().join("slow.db"), &DatabaseConfig::default())
            .await
            .unwrap()
            .with_query_timeout(std::time::Duration::from_millis(1));
        let executor = QueryExecutor::new(Arc::new(client));

        let err = executor
            .execute(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 5000000) \
                 SELECT COUNT(*) FROM n",
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());

        let result = executor.execute("SELECT 7 AS n").await.unwrap();
        assert_eq!(result.rows, vec![vec![crate::db::Value::Int(7)]]);
    }
}
