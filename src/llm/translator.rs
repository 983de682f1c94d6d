//! Request translator.
//!
//! Wraps an oracle client: turns a request into SQL plus a report path, and
//! turns a result set back into a short summary. Both calls are bounded by a
//! timeout.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{LlmConfig, ReportConfig};
use crate::db::{ResultSet, Schema};
use crate::error::{Result, SqlReportError};
use crate::llm::parser::parse_translation;
use crate::llm::prompt::{build_summary_messages, build_translation_messages};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// A request translated into something the executor and writer can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedRequest {
    /// SQL proposed by the oracle. Not yet validated.
    pub sql: String,
    /// Where the report will be written.
    pub output_path: PathBuf,
    /// Path the oracle asked for, kept for diagnostics.
    pub proposed_path: Option<PathBuf>,
}

/// Translates natural-language requests through an oracle.
#[derive(Clone)]
pub struct RequestTranslator {
    client: Arc<dyn LlmClient>,
    schema: Schema,
    default_path: PathBuf,
    protected_paths: Vec<PathBuf>,
    timeout: Duration,
    summary_row_limit: usize,
}

impl RequestTranslator {
    /// Creates a translator for `schema` with a 30 second oracle deadline.
    pub fn new(client: Arc<dyn LlmClient>, schema: Schema) -> Self {
        let report = ReportConfig::default();
        Self {
            client,
            schema,
            default_path: report.default_path,
            protected_paths: Vec::new(),
            timeout: Duration::from_secs(LlmConfig::default().timeout_secs),
            summary_row_limit: report.summary_row_limit,
        }
    }

    /// Applies the oracle timeout from `llm` and the report defaults from
    /// `report`.
    pub fn with_config(mut self, llm: &LlmConfig, report: &ReportConfig) -> Self {
        self.timeout = Duration::from_secs(llm.timeout_secs);
        self.default_path = report.default_path.clone();
        self.summary_row_limit = report.summary_row_limit;
        self
    }

    /// Overrides the oracle deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the fallback report path.
    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Refuses oracle report paths that would land on the database at `path`
    /// or on its journal files.
    pub fn with_protected_database(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.protected_paths.push(path.to_path_buf());
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sibling = OsString::from(path.as_os_str());
            sibling.push(suffix);
            self.protected_paths.push(PathBuf::from(sibling));
        }
        self
    }

    /// Schema shown to the oracle.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Asks the oracle for SQL answering `request`.
    ///
    /// `caller_path`, when given, is used as the report path regardless of
    /// what the oracle proposes.
    pub async fn translate(
        &self,
        request: &str,
        caller_path: Option<&Path>,
    ) -> Result<TranslatedRequest> {
        let request = request.trim();
        if request.is_empty() {
            return Err(SqlReportError::translation("Request is empty"));
        }

        let messages = build_translation_messages(&self.schema, &self.default_path, request);
        let response = self.call(&messages).await?;
        let translation = parse_translation(&response)?;

        let output_path = resolve_output_path(
            caller_path,
            translation.path.as_deref(),
            &self.default_path,
            &self.protected_paths,
        );
        debug!(sql = %translation.sql, path = %output_path.display(), "Translated request");

        Ok(TranslatedRequest {
            sql: translation.sql,
            output_path,
            proposed_path: translation.path,
        })
    }

    /// Asks the oracle for a plain-text summary of `result`.
    pub async fn summarize(&self, request: &str, sql: &str, result: &ResultSet) -> Result<String> {
        let messages = build_summary_messages(request, sql, result, self.summary_row_limit);
        let summary = self.call(&messages).await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SqlReportError::translation("Oracle returned an empty summary"));
        }
        info!(chars = summary.len(), "Summary received");
        Ok(summary.to_string())
    }

    async fn call(&self, messages: &[Message]) -> Result<String> {
        tokio::time::timeout(self.timeout, self.client.complete(messages))
            .await
            .map_err(|_| SqlReportError::TranslationTimeout(self.timeout))?
    }
}

/// Picks the report path: the caller's wins, then a safe oracle proposal,
/// then the default.
///
/// An oracle proposal must be a relative `.csv` path inside the working
/// directory that does not resolve to any of `protected`.
pub fn resolve_output_path(
    caller: Option<&Path>,
    proposed: Option<&Path>,
    default: &Path,
    protected: &[PathBuf],
) -> PathBuf {
    if let Some(path) = caller {
        return path.to_path_buf();
    }

    match proposed {
        Some(path) if is_safe_relative_path(path) && !is_protected(path, protected) => {
            path.to_path_buf()
        }
        Some(path) => {
            warn!(
                proposed = %path.display(),
                "Ignoring unsafe report path from oracle"
            );
            default.to_path_buf()
        }
        None => default.to_path_buf(),
    }
}

/// Relative, ends in `.csv`, and never climbs out of the working directory.
fn is_safe_relative_path(path: &Path) -> bool {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    is_csv
        && path.file_name().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// True if `path` names the same file as one of `protected`, lexically or
/// through a symlink.
fn is_protected(path: &Path, protected: &[PathBuf]) -> bool {
    let candidate = absolute(path);
    let resolved = std::fs::canonicalize(path).ok();
    protected.iter().any(|guarded| {
        absolute(guarded) == candidate
            || resolved
                .as_ref()
                .is_some_and(|real| std::fs::canonicalize(guarded).ok().as_ref() == Some(real))
    })
}

/// Joins relative paths onto the working directory and drops `.` segments.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
