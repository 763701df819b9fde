//! Shared HTTP send loop with exponential backoff

use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Seconds to wait when a 429 carries no usable retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Backoff before the given attempt (attempt 0 never waits)
pub(crate) fn backoff_for(attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1))
}

/// Send a request built by `build`, retrying network failures and retryable
/// statuses. A 429 is returned immediately as [`LlmError::RateLimited`].
pub(crate) async fn send_with_retry<F>(label: &str, build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    debug!(%label, "send_with_retry: called");
    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = backoff_for(attempt);
            warn!(
                %label,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "send_with_retry: retrying after transient error"
            );
            tokio::time::sleep(backoff).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("send_with_retry: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "send_with_retry: retryable error");
            last_error = Some(LlmError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            debug!(%status, "send_with_retry: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("send_with_retry: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(529));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(429));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_for(0), Duration::ZERO);
        assert_eq!(backoff_for(1), Duration::from_millis(1000));
        assert_eq!(backoff_for(2), Duration::from_millis(2000));
        assert_eq!(backoff_for(3), Duration::from_millis(4000));
    }
}
