//! Core orchestrator for sqlreport.
//!
//! Drives one request through translation, execution, report writing and
//! summarization. Each request is handled independently; the orchestrator
//! holds no per-request state, so one instance serves concurrent requests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::db::ResultSet;
use crate::error::SqlReportError;
use crate::llm::{RequestTranslator, TranslatedRequest};
use crate::query::QueryExecutor;
use crate::report::ReportWriter;

/// Pipeline stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Translation,
    Execution,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translation => write!(f, "translation"),
            Self::Execution => write!(f, "execution"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Why a request ended in `Failed`.
#[derive(Debug)]
pub struct FailureReason {
    pub stage: Stage,
    pub error: SqlReportError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

/// Lifecycle of a single request.
///
/// `Summarized` and `Failed` are terminal. A request that stops at
/// `Reported` had its report written but no summary.
#[derive(Debug)]
pub enum RequestState {
    Received,
    Translated,
    Executed,
    Reported,
    Summarized,
    Failed(FailureReason),
}

impl RequestState {
    /// Short name used in logs and transition lists.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Translated => "Translated",
            Self::Executed => "Executed",
            Self::Reported => "Reported",
            Self::Summarized => "Summarized",
            Self::Failed(_) => "Failed",
        }
    }

    /// Returns true for states no transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summarized | Self::Failed(_))
    }
}

/// Everything known about a request once handling stopped.
#[derive(Debug)]
pub struct RequestOutcome {
    pub request: String,
    pub state: RequestState,
    /// States visited, in order, starting with `Received`.
    pub transitions: Vec<&'static str>,
    pub translation: Option<TranslatedRequest>,
    pub result: Option<ResultSet>,
    pub report_path: Option<PathBuf>,
    pub summary: Option<String>,
    /// Set when the report was written but the summary could not be produced.
    pub summary_error: Option<SqlReportError>,
    pub elapsed: Duration,
}

impl RequestOutcome {
    fn new(request: &str) -> Self {
        Self {
            request: request.to_string(),
            state: RequestState::Received,
            transitions: vec![RequestState::Received.name()],
            translation: None,
            result: None,
            report_path: None,
            summary: None,
            summary_error: None,
            elapsed: Duration::ZERO,
        }
    }

    fn advance(&mut self, state: RequestState) {
        info!(stage = state.name(), request = %self.request, "Request advanced");
        self.transitions.push(state.name());
        self.state = state;
    }

    fn fail(&mut self, stage: Stage, error: SqlReportError) {
        warn!(stage = %stage, error = %error, "Request failed");
        self.transitions.push("Failed");
        self.state = RequestState::Failed(FailureReason { stage, error });
    }

    /// True for `Summarized` and `Reported`: the report exists.
    pub fn is_success(&self) -> bool {
        matches!(self.state, RequestState::Summarized | RequestState::Reported)
    }

    /// The failure, if the request failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            RequestState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Sequences the pipeline stages for each request.
pub struct Orchestrator {
    translator: RequestTranslator,
    executor: QueryExecutor,
    writer: ReportWriter,
}

impl Orchestrator {
    /// Creates an orchestrator from its collaborators.
    pub fn new(translator: RequestTranslator, executor: QueryExecutor, writer: ReportWriter) -> Self {
        Self {
            translator,
            executor,
            writer,
        }
    }

    /// Handles `request`, letting the oracle choose the report path.
    pub async fn handle(&self, request: &str) -> RequestOutcome {
        self.handle_with_output(request, None).await
    }

    /// Handles `request`, writing the report to `output` when given.
    ///
    /// Never returns an error: failures are recorded in the outcome.
    pub async fn handle_with_output(&self, request: &str, output: Option<&Path>) -> RequestOutcome {
        let start = Instant::now();
        let mut outcome = RequestOutcome::new(request);
        self.run(&mut outcome, output).await;
        outcome.elapsed = start.elapsed();

        info!(
            state = outcome.state.name(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Request finished"
        );
        outcome
    }

    async fn run(&self, outcome: &mut RequestOutcome, output: Option<&Path>) {
        let translated = match self.translator.translate(&outcome.request, output).await {
            Ok(translated) => translated,
            Err(e) => return outcome.fail(Stage::Translation, e),
        };
        outcome.translation = Some(translated.clone());
        outcome.advance(RequestState::Translated);

        let result = match self.executor.execute(&translated.sql).await {
            Ok(result) => result,
            Err(e) => return outcome.fail(Stage::Execution, query_failed(e)),
        };
        outcome.advance(RequestState::Executed);

        let path = match self.writer.write(&translated.output_path, &result).await {
            Ok(path) => path,
            Err(e) => {
                outcome.result = Some(result);
                return outcome.fail(Stage::Report, e);
            }
        };
        outcome.report_path = Some(path);
        outcome.advance(RequestState::Reported);

        match self
            .translator
            .summarize(&outcome.request, &translated.sql, &result)
            .await
        {
            Ok(summary) => {
                outcome.summary = Some(summary);
                outcome.result = Some(result);
                outcome.advance(RequestState::Summarized);
            }
            Err(e) => {
                warn!(error = %e, "Summary unavailable; report is still written");
                outcome.result = Some(result);
                outcome.summary_error = Some(e);
            }
        }
    }
}

/// Prefixes plain query errors so the user sees which step broke.
fn query_failed(error: SqlReportError) -> SqlReportError {
    match error {
        SqlReportError::Query(msg) => SqlReportError::Query(format!("query failed: {msg}")),
        other => other,
    }
}
