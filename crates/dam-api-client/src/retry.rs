//! Bounded exponential backoff for idempotent requests.
//!
//! Only transport failures (network, timeout) are retried. HTTP status
//! errors and parse failures surface on the first attempt.

use std::future::Future;

use dam_core::{DamResult, RetryConfig};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_retries` retries are spent. Retry `n` waits `2^n * base`.
pub async fn with_retry<F, Fut, T>(policy: &RetryConfig, label: &str, mut operation: F) -> DamResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DamResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    request = label,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
