//! Single retry on HTTP 429.
//!
//! A rate-limited request sleeps for the server's reset hint (capped, plus a
//! little jitter) and is attempted exactly once more. Every other error,
//! including network failures, is returned to the caller untouched.

use std::future::Future;
use std::time::Duration;

use crate::error::MarketplaceError;

/// Upper bound on the random jitter added to the reset hint.
const MAX_JITTER_MS: f64 = 250.0;

/// Runs `operation`; on [`MarketplaceError::RateLimited`] waits
/// `min(retry_after_secs, max_wait_secs)` and runs it once more.
pub(crate) async fn retry_once_when_rate_limited<T, F, Fut>(
    max_wait_secs: u64,
    mut operation: F,
) -> Result<T, MarketplaceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketplaceError>>,
{
    match operation().await {
        Err(MarketplaceError::RateLimited {
            endpoint,
            retry_after_secs,
        }) => {
            let wait_secs = retry_after_secs.min(max_wait_secs);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let jitter_ms = (rand::random::<f64>() * MAX_JITTER_MS) as u64;
            tracing::warn!(
                endpoint = %endpoint,
                retry_after_secs,
                wait_secs,
                "rate limited; retrying once after reset hint"
            );
            tokio::time::sleep(Duration::from_secs(wait_secs) + Duration::from_millis(jitter_ms))
                .await;
            operation().await
        }
        other => other,
    }
}
