//! Error types for sqlreport.
//!
//! Defines the main error enum used throughout the application.

use std::time::Duration;
use thiserror::Error;

/// Main error type for sqlreport operations.
#[derive(Error, Debug)]
pub enum SqlReportError {
    /// Oracle failures (unavailable, malformed response, refusal).
    #[error("Translation error: {0}")]
    Translation(String),

    /// The oracle did not answer within the configured deadline.
    #[error("Translation error: oracle did not respond within {}s", .0.as_secs())]
    TranslationTimeout(Duration),

    /// Query errors (syntax errors, unknown columns, rejected statements, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// The query did not finish within the configured deadline.
    #[error("Query error: query timed out after {}s", .0.as_secs())]
    QueryTimeout(Duration),

    /// Report file could not be written or read.
    #[error("I/O error: {0}")]
    Io(String),

    /// A fixture insert collided with an existing identifier.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Configuration errors (invalid config file, missing API key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlReportError {
    /// Creates a translation error with the given message.
    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates a constraint violation with the given message.
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Translation(_) | Self::TranslationTimeout(_) => "Translation Error",
            Self::Query(_) | Self::QueryTimeout(_) => "Query Error",
            Self::Io(_) => "I/O Error",
            Self::ConstraintViolation(_) => "Constraint Violation",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// The message without its category prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Translation(msg)
            | Self::Query(msg)
            | Self::Io(msg)
            | Self::ConstraintViolation(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::TranslationTimeout(d) => {
                format!("oracle did not respond within {}s", d.as_secs())
            }
            Self::QueryTimeout(d) => format!("query timed out after {}s", d.as_secs()),
        }
    }

    /// Returns true for the deadline variants.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TranslationTimeout(_) | Self::QueryTimeout(_))
    }
}

/// Result type alias using SqlReportError.
pub type Result<T> = std::result::Result<T, SqlReportError>;
