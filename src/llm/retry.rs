//! Bounded retry for oracle HTTP calls.
//!
//! Only transport-level failures are retried: timeouts, connection errors,
//! HTTP 429 and 5xx. A response that arrives but cannot be understood is
//! never retried.

use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SqlReportError};

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` tries (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Sends the request built by `build` until it succeeds or the policy is
/// exhausted, returning the body of the first successful response.
///
/// `parse_error` maps a non-success status and body to an error and whether
/// it is worth retrying.
pub async fn send_with_retry<B, E>(
    provider: &str,
    policy: RetryPolicy,
    build: B,
    parse_error: E,
) -> Result<String>
where
    B: Fn() -> RequestBuilder,
    E: Fn(StatusCode, &str) -> (SqlReportError, bool),
{
    let mut attempt = 1;

    loop {
        debug!(
            "{} API request attempt {} of {}",
            provider, attempt, policy.max_attempts
        );

        let (error, is_retryable) = match build().send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.map_err(|e| {
                    SqlReportError::translation(format!("Failed to read {provider} response: {e}"))
                })?;

                if status.is_success() {
                    return Ok(body);
                }
                parse_error(status, &body)
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    SqlReportError::translation(format!("{provider} request timed out"))
                } else if e.is_connect() {
                    SqlReportError::translation(format!(
                        "Failed to connect to {provider} API. Check your network."
                    ))
                } else {
                    SqlReportError::translation(format!("{provider} request failed: {e}"))
                };
                (error, is_retryable_request_error(&e))
            }
        };

        if !is_retryable || attempt >= policy.max_attempts {
            return Err(error);
        }

        let delay = policy.delay_after(attempt);
        warn!(
            "{} API request failed (attempt {}), retrying in {:?}: {}",
            provider, attempt, delay, error
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Determines if a request error is retryable.
fn is_retryable_request_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_backoff_doubles() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_reported() {
        // Port 9 on localhost is not expected to accept connections.
        let client = reqwest::Client::new();
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        };

        let err = send_with_retry(
            "Test",
            policy,
            || client.get("http://127.0.0.1:9/"),
            |status, _| (SqlReportError::translation(status.to_string()), false),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SqlReportError::Translation(_)));
    }
}
