//! End-to-end pipeline tests with the mock oracle.

use std::sync::Arc;
use std::time::Duration;

use sqlreport::db::DatabaseClient;
use sqlreport::error::SqlReportError;
use sqlreport::llm::{MockLlmClient, RequestTranslator};
use sqlreport::orchestrator::{Orchestrator, RequestState, Stage};
use sqlreport::query::QueryExecutor;
use sqlreport::report::{read_report, ReportWriter};
use sqlreport::store::EmployeeStore;
use tempfile::TempDir;

use super::common::{seed_alice_and_nine, temp_store};

async fn pipeline(client: MockLlmClient) -> (Orchestrator, EmployeeStore, TempDir) {
    let (store, dir) = temp_store().await;
    seed_alice_and_nine(&store).await;

    let db: Arc<dyn DatabaseClient> = Arc::new(store.client().clone());
    let translator = RequestTranslator::new(Arc::new(client), store.schema().await.unwrap())
        .with_default_path(dir.path().join("results.csv"));
    let orchestrator = Orchestrator::new(translator, QueryExecutor::new(db), ReportWriter::new());
    (orchestrator, store, dir)
}

#[tokio::test]
async fn test_highest_salary_end_to_end() {
    let (orchestrator, _store, dir) = pipeline(MockLlmClient::new()).await;
    let output = dir.path().join("highest.csv");

    let outcome = orchestrator
        .handle_with_output(
            "get the name of the employee with the highest salary",
            Some(&output),
        )
        .await;

    assert!(matches!(
        outcome.state,
        RequestState::Summarized | RequestState::Reported
    ));
    let report = read_report(&output).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert!(report.rows[0].contains(&"Alice".to_string()));
    assert_eq!(outcome.report_path.as_deref(), Some(output.as_path()));
}

#[tokio::test]
async fn test_oracle_path_is_confined() {
    let client = MockLlmClient::new().with_response(
        "escape",
        r#"{"sql": "SELECT name FROM Employee WHERE id = 1", "path": "../../escaped.csv"}"#,
    );
    let (orchestrator, _store, dir) = pipeline(client).await;

    let outcome = orchestrator.handle("escape the sandbox").await;

    let expected = dir.path().join("results.csv");
    assert_eq!(outcome.report_path, Some(expected.clone()));
    assert_eq!(read_report(&expected).unwrap().rows, vec![vec!["Alice".to_string()]]);
}

#[tokio::test]
async fn test_oracle_timeout_fails_request() {
    let (store, dir) = temp_store().await;
    let translator = RequestTranslator::new(
        Arc::new(MockLlmClient::new().with_delay(Duration::from_millis(500))),
        store.schema().await.unwrap(),
    )
    .with_timeout(Duration::from_millis(20))
    .with_default_path(dir.path().join("results.csv"));
    let orchestrator = Orchestrator::new(
        translator,
        QueryExecutor::new(Arc::new(store.client().clone())),
        ReportWriter::new(),
    );

    let outcome = orchestrator.handle("highest salary").await;

    let reason = outcome.failure().unwrap();
    assert_eq!(reason.stage, Stage::Translation);
    assert!(matches!(reason.error, SqlReportError::TranslationTimeout(_)));
    assert!(!dir.path().join("results.csv").exists());
}

#[tokio::test]
async fn test_ambiguous_oracle_reply_never_reaches_database() {
    let client = MockLlmClient::new().with_response(
        "ambiguous",
        "```sql\nSELECT name FROM Employee\n```\n```sql\nDELETE FROM Employee\n```",
    );
    let (orchestrator, store, _dir) = pipeline(client).await;

    let outcome = orchestrator.handle("something ambiguous").await;

    assert_eq!(outcome.failure().unwrap().stage, Stage::Translation);
    assert_eq!(store.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_partial_success_keeps_report() {
    let (orchestrator, _store, dir) = pipeline(MockLlmClient::new().with_failing_summaries()).await;
    let output = dir.path().join("avg.csv");

    let outcome = orchestrator
        .handle_with_output("average salary per department", Some(&output))
        .await;

    assert!(matches!(outcome.state, RequestState::Reported));
    assert_eq!(outcome.exit_code(), 0);
    let report = read_report(&output).unwrap();
    assert_eq!(report.columns, vec!["dept", "avg_salary"]);
    assert_eq!(report.rows.len(), 3);
}

#[tokio::test]
async fn test_concurrent_writers_to_same_path() {
    let (orchestrator, _store, dir) = pipeline(MockLlmClient::new()).await;
    let orchestrator = Arc::new(orchestrator);
    let output = dir.path().join("shared.csv");

    let requests = ["highest salary", "all employees", "count the employees"];
    let handles: Vec<_> = requests
        .iter()
        .map(|request| {
            let orchestrator = Arc::clone(&orchestrator);
            let output = output.clone();
            let request = request.to_string();
            tokio::spawn(async move { orchestrator.handle_with_output(&request, Some(&output)).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    let report = read_report(&output).unwrap();
    let complete = match report.columns.as_slice() {
        [name] if name == "name" => report.rows.len() == 1,
        [employees] if employees == "employees" => report.rows.len() == 1,
        columns if columns.len() == 4 => report.rows.len() == 10,
        _ => false,
    };
    assert!(complete, "report is a complete result: {report:?}");
}

#[tokio::test]
async fn test_oracle_cannot_target_database_file() {
    let client = MockLlmClient::new().with_response(
        "clobber",
        r#"{"sql": "SELECT 1 AS x", "path": "employees.db"}"#,
    );
    let (store, dir) = temp_store().await;
    seed_alice_and_nine(&store).await;
    let database = dir.path().join("employees.db");
    let translator = RequestTranslator::new(Arc::new(client), store.schema().await.unwrap())
        .with_default_path(dir.path().join("results.csv"))
        .with_protected_database(&database);
    let orchestrator = Orchestrator::new(
        translator,
        QueryExecutor::new(Arc::new(store.client().clone())),
        ReportWriter::new(),
    );

    let outcome = orchestrator.handle("clobber the store").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.report_path, Some(dir.path().join("results.csv")));
    assert_eq!(store.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_report_keeps_every_row_when_summarized() {
    let (orchestrator, store, dir) = pipeline(MockLlmClient::new()).await;
    store.generate_fixtures(1490).await.unwrap();
    let output = dir.path().join("everyone.csv");

    let outcome = orchestrator
        .handle_with_output("list all employees", Some(&output))
        .await;

    assert!(matches!(outcome.state, RequestState::Summarized));
    assert_eq!(outcome.result.as_ref().unwrap().row_count(), 1500);
    assert_eq!(read_report(&output).unwrap().rows.len(), 1500);
}
