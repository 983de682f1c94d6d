//! Command-line argument parsing for sqlreport.

use clap::Parser;
use sqlreport::config::Config;
use std::path::PathBuf;

/// Answer a question about the employee database and write the result to CSV.
#[derive(Parser, Debug)]
#[command(name = "sqlreport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Natural-language request, e.g. "who has the highest salary?"
    #[arg(value_name = "REQUEST")]
    pub request: String,

    /// Report path (overrides any path the model proposes)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// LLM provider (openai, gemini, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Model name for the provider
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Insert N synthetic employees before running the request
    #[arg(long, value_name = "N")]
    pub seed: Option<usize>,

    /// Allow single INSERT/UPDATE statements (never DELETE or DDL)
    #[arg(long)]
    pub allow_writes: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flags over values from the config file and environment.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}
