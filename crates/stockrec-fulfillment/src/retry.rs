//! Retry with exponential back-off and jitter for the fulfillment client.
//!
//! [`retry_with_backoff`] retries transient failures (timeouts, connection
//! errors, 5xx) and rate limiting. A rate-limited attempt waits for the
//! server's reset hint instead of the back-off schedule.

use std::future::Future;
use std::time::Duration;

use crate::error::FulfillmentError;

/// Upper bound on any single wait.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a delay.
///
/// Authentication, deserialization, URL and pagination errors are final;
/// retrying would not change the outcome.
pub(crate) fn is_retriable(err: &FulfillmentError) -> bool {
    match err {
        FulfillmentError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FulfillmentError::UnexpectedStatus { status, .. } => *status >= 500,
        FulfillmentError::RateLimited { .. } => true,
        FulfillmentError::Authentication { .. }
        | FulfillmentError::Deserialize { .. }
        | FulfillmentError::InvalidBaseUrl { .. }
        | FulfillmentError::PaginationLimit { .. } => false,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn delay_ms(err: &FulfillmentError, attempt: u32, backoff_base_ms: u64) -> u64 {
    if let FulfillmentError::RateLimited { retry_after_secs } = err {
        return retry_after_secs.saturating_mul(1_000).min(MAX_DELAY_MS);
    }
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
}

/// Runs `operation` with up to `max_retries` additional attempts.
///
/// With `backoff_base_ms = 1_000` the waits are roughly 1 s, 2 s, 4 s
/// (±25 % jitter), capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FulfillmentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FulfillmentError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = delay_ms(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "fulfillment request failed; retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
