//! Report writer.
//!
//! Serializes a result set to CSV. The file is written to a temporary path in
//! the destination directory and renamed into place, so readers never see a
//! half-written report and concurrent writers resolve to last-writer-wins.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::db::{ResultSet, Value};
use crate::error::{Result, SqlReportError};

/// Contents of a report read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContents {
    /// Header row.
    pub columns: Vec<String>,
    /// Data rows, as written.
    pub rows: Vec<Vec<String>>,
}

/// Writes result sets to CSV files.
#[derive(Debug, Clone, Default)]
pub struct ReportWriter;

impl ReportWriter {
    /// Creates a writer.
    pub fn new() -> Self {
        Self
    }

    /// Writes `result` to `path`, replacing any existing file.
    ///
    /// Runs on the blocking pool.
    pub async fn write(&self, path: &Path, result: &ResultSet) -> Result<PathBuf> {
        let path = path.to_path_buf();
        let result = result.clone();
        tokio::task::spawn_blocking(move || write_report(&path, &result).map(|()| path))
            .await
            .map_err(|e| SqlReportError::internal(format!("Report task failed: {e}")))?
    }
}

/// Writes `result` to `path` atomically.
pub fn write_report(path: &Path, result: &ResultSet) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        SqlReportError::io(format!(
            "Cannot create report in {}: {e}",
            parent.display()
        ))
    })?;

    {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(temp.as_file_mut());

        writer
            .write_record(result.columns.iter().map(|c| c.name.as_str()))
            .map_err(|e| write_error(path, e))?;
        for row in &result.rows {
            writer
                .write_record(row.iter().map(csv_field))
                .map_err(|e| write_error(path, e))?;
        }
        writer.flush().map_err(|e| write_error(path, e))?;
    }

    let file: &mut File = temp.as_file_mut();
    file.flush().map_err(|e| write_error(path, e))?;
    file.sync_all().map_err(|e| write_error(path, e))?;

    temp.persist(path)
        .map_err(|e| write_error(path, e.error))?;

    debug!(path = %path.display(), rows = result.rows.len(), "Report written");
    Ok(())
}

/// Reads a report back into header and rows.
pub fn read_report(path: &Path) -> Result<ReportContents> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| SqlReportError::io(format!("Cannot read {}: {e}", path.display())))?;

    let columns = reader
        .headers()
        .map_err(|e| SqlReportError::io(format!("Cannot read {}: {e}", path.display())))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| SqlReportError::io(format!("Cannot read {}: {e}", path.display())))
        })
        .collect::<Result<Vec<Vec<String>>>>()?;

    Ok(ReportContents { columns, rows })
}

/// Renders one value as a CSV field. NULL becomes an empty field.
pub fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

fn write_error(path: &Path, error: impl std::fmt::Display) -> SqlReportError {
    SqlReportError::io(format!("Cannot write {}: {error}", path.display()))
}
