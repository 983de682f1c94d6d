//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating oracle clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{Result, SqlReportError};
use crate::llm::gemini::DEFAULT_GEMINI_MODEL;
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    GeminiClient, GeminiConfig, LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig,
};

/// Creates the oracle client described by `config`.
///
/// API keys are resolved in order:
/// 1. `api_key` in the config file
/// 2. `OPENAI_API_KEY` or `GOOGLE_API_KEY`
///
/// An OpenAI client with a custom `base_url` needs no key, so local
/// OpenAI-compatible servers work without one.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    create_client_with(config, |key| std::env::var(key).ok())
}

fn create_client_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmClient>> {
    let provider: LlmProvider = config
        .provider
        .parse()
        .map_err(SqlReportError::config)?;

    let model = |default: &str| {
        if config.model.trim().is_empty() {
            default.to_string()
        } else {
            config.model.clone()
        }
    };

    match provider {
        LlmProvider::OpenAi => {
            let key = config
                .api_key
                .clone()
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| config.base_url.as_ref().map(|_| "unused".to_string()))
                .ok_or_else(|| {
                    SqlReportError::config(
                        "No API key configured. Set OPENAI_API_KEY or llm.api_key.",
                    )
                })?;

            let mut openai = OpenAiConfig::new(key, model(DEFAULT_OPENAI_MODEL))
                .with_timeout(config.timeout_secs)
                .with_temperature(config.temperature)
                .with_max_retries(config.max_retries);
            if let Some(url) = &config.base_url {
                openai = openai.with_base_url(url.as_str());
            }
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Gemini => {
            let key = config
                .api_key
                .clone()
                .or_else(|| lookup("GOOGLE_API_KEY"))
                .ok_or_else(|| {
                    SqlReportError::config(
                        "No API key configured. Set GOOGLE_API_KEY or llm.api_key.",
                    )
                })?;

            let mut gemini = GeminiConfig::new(key, model(DEFAULT_GEMINI_MODEL))
                .with_timeout(config.timeout_secs)
                .with_temperature(config.temperature)
                .with_max_retries(config.max_retries);
            if let Some(url) = &config.base_url {
                gemini = gemini.with_base_url(url.as_str());
            }
            Ok(Arc::new(GeminiClient::new(gemini)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
