//! Retry with exponential backoff for model calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::LlmError;

/// Upper bound on any single wait.
const MAX_DELAY_MS: u64 = 60_000;

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_DELAY_MS))
}

/// Parse Retry-After header value (seconds).
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    header_value?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(MAX_DELAY_MS / 1000)))
}

/// Run `make_request` up to `max_attempts` times.
///
/// Only [`LlmError::is_retryable`] failures are retried; a rate limit with a
/// `Retry-After` hint waits for the hinted duration instead of the backoff.
pub async fn retry_with_backoff<F, Fut, T>(
    max_attempts: u32,
    base_ms: u64,
    make_request: F,
) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match make_request().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let wait = match &e {
                    LlmError::RateLimited {
                        retry_after_secs: Some(secs),
                    } => Duration::from_secs((*secs).min(MAX_DELAY_MS / 1000)),
                    _ => backoff_delay(attempt, base_ms),
                };
                warn!(
                    "LLM call failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
