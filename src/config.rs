//! Configuration management for sqlreport.
//!
//! Handles loading configuration from TOML files and environment variables,
//! covering the LLM provider, the SQLite database, and report output.

use crate::error::{Result, SqlReportError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for sqlreport.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Report output configuration.
    #[serde(default)]
    pub report: ReportConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider: "openai", "gemini" or "mock".
    pub provider: String,

    /// Model name. Empty means the provider's default.
    pub model: String,

    /// API key. Prefer the provider's environment variable instead.
    pub api_key: Option<String>,

    /// Base URL override (for OpenAI-compatible local servers).
    pub base_url: Option<String>,

    /// Deadline for a single oracle call, retries included.
    pub timeout_secs: u64,

    /// Attempts for transport-level failures.
    pub max_retries: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: String::new(),
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            max_retries: 3,
            temperature: 0.9,
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: PathBuf,

    /// Deadline for a single query, transaction included.
    pub query_timeout_secs: u64,

    /// How long SQLite waits on a locked database.
    pub busy_timeout_secs: u64,

    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database.db"),
            query_timeout_secs: 30,
            busy_timeout_secs: 5,
            max_connections: 5,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Report path used when neither the caller nor the oracle names one.
    pub default_path: PathBuf,

    /// Rows handed to the oracle when asking for a summary.
    pub summary_row_limit: usize,

    /// Rows printed to the console when no summary is available. The report
    /// file always holds every row.
    pub display_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("results.csv"),
            summary_row_limit: 50,
            display_rows: 1000,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlreport")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlReportError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            SqlReportError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `SQLREPORT_*` environment variables over file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SQLREPORT_DATABASE") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(provider) = lookup("SQLREPORT_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("SQLREPORT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("SQLREPORT_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
    }
}
