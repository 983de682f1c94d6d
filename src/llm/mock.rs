//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, and can be told
//! to fail or stall so every orchestrator path can be exercised offline.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SqlReportError};
use crate::llm::prompt::ROWS_RETURNED_LABEL;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Inputs containing any of these patterns fail.
    failures: Vec<String>,
    /// Fail every summary request.
    fail_summaries: bool,
    /// Artificial latency per call.
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes any input containing `pattern` fail as if the oracle were down.
    pub fn with_failure(mut self, pattern: impl Into<String>) -> Self {
        self.failures.push(pattern.into());
        self
    }

    /// Makes every summary request fail.
    pub fn with_failing_summaries(mut self) -> Self {
        self.fail_summaries = true;
        self
    }

    /// Delays every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> Result<String> {
        let input_lower = input.to_lowercase();

        if self
            .failures
            .iter()
            .any(|pattern| input_lower.contains(&pattern.to_lowercase()))
        {
            return Err(SqlReportError::translation("Mock oracle unavailable"));
        }

        let is_summary = input.contains(ROWS_RETURNED_LABEL);
        if is_summary && self.fail_summaries {
            return Err(SqlReportError::translation("Mock oracle unavailable"));
        }

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return Ok(response.clone());
            }
        }

        if is_summary {
            return Ok(Self::summarize(input));
        }

        // Default pattern matching
        if input_lower.contains("highest salary") {
            return Ok(translation(
                "SELECT name FROM Employee ORDER BY salary DESC LIMIT 1",
                "results.csv",
            ));
        }

        if input_lower.contains("count") && input_lower.contains("employee") {
            return Ok(translation(
                "SELECT COUNT(*) AS employees FROM Employee",
                "count.csv",
            ));
        }

        if input_lower.contains("average salary") {
            return Ok(translation(
                "SELECT dept, AVG(salary) AS avg_salary FROM Employee GROUP BY dept ORDER BY dept",
                "average_salary.csv",
            ));
        }

        if input_lower.contains("all employees") {
            return Ok(translation(
                "SELECT id, name, dept, salary FROM Employee ORDER BY id",
                "employees.csv",
            ));
        }

        Ok("I don't understand that question. Could you please rephrase it?".to_string())
    }

    /// Deterministic summary built from the rendered rows.
    fn summarize(input: &str) -> String {
        let count = input
            .lines()
            .find_map(|line| line.strip_prefix(ROWS_RETURNED_LABEL))
            .map(str::trim)
            .unwrap_or("0");
        let first_row = input
            .lines()
            .skip_while(|line| !line.starts_with(ROWS_RETURNED_LABEL))
            .nth(1)
            .filter(|line| line.starts_with('{'));

        match first_row {
            Some(row) => format!("The query returned {count} row(s). First row: {row}"),
            None => format!("The query returned {count} row(s)."),
        }
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

fn translation(sql: &str, path: &str) -> String {
    serde_json::json!({ "sql": sql, "path": path }).to_string()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let input = Self::extract_user_input(messages);
        self.mock_response(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_translation;

    #[tokio::test]
    async fn test_mock_translates_highest_salary() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user(
            "get the name of the employee with the highest salary",
        )];

        let response = client.complete(&messages).await.unwrap();
        let parsed = parse_translation(&response).unwrap();

        assert!(parsed.sql.contains("ORDER BY salary DESC"));
        assert_eq!(parsed.path.unwrap().to_str(), Some("results.csv"));
    }

    #[tokio::test]
    async fn test_mock_returns_unknown_response() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("What is the meaning of life?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("don't understand"));
        assert!(parse_translation(&response).is_err());
    }

    #[tokio::test]
    async fn test_mock_custom_response_is_case_insensitive() {
        let client = MockLlmClient::new()
            .with_response("custom query", "```sql\nSELECT 42;\n```");

        let messages = vec![Message::user("Run the CUSTOM QUERY")];
        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT 42"));
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let client = MockLlmClient::new().with_failure("outage");

        let err = client
            .complete(&[Message::user("simulate an outage")])
            .await
            .unwrap_err();

        assert!(matches!(err, SqlReportError::Translation(_)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_summary() {
        let client = MockLlmClient::new();
        let input = format!("Request: x\n\n{ROWS_RETURNED_LABEL} 1\n{{\"name\":\"Alice\"}}\n");

        let response = client.complete(&[Message::user(input)]).await.unwrap();

        assert_eq!(
            response,
            "The query returned 1 row(s). First row: {\"name\":\"Alice\"}"
        );
    }

    #[tokio::test]
    async fn test_mock_failing_summaries_still_translates() {
        let client = MockLlmClient::new().with_failing_summaries();

        assert!(client
            .complete(&[Message::user("count employees")])
            .await
            .is_ok());
        let summary = format!("{ROWS_RETURNED_LABEL} 3");
        assert!(client.complete(&[Message::user(summary)]).await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_call_counter() {
        let client = MockLlmClient::new();
        let clone = client.clone();

        clone.complete(&[Message::user("hi")]).await.unwrap();

        assert_eq!(client.calls(), 1);
    }
}
