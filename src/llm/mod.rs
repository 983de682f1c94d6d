//! Oracle integration for sqlreport.
//!
//! The language model is an opaque oracle behind [`LlmClient`]. This module
//! holds the provider clients, prompt construction, strict parsing of
//! replies, and the [`RequestTranslator`] built on top of them.

pub mod factory;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
mod retry;
pub mod translator;
pub mod types;

pub use factory::create_client;
pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::parse_translation;
pub use translator::{resolve_output_path, RequestTranslator, TranslatedRequest};
pub use types::{Message, Role, Translation};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::Result;

/// Trait for oracle clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI, or any OpenAI-compatible server via `base_url`.
    #[default]
    OpenAi,
    /// Google Gemini.
    Gemini,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {s}")),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
