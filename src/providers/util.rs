use crate::core::config::RetryPolicy;
use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async request on transport errors according to `policy`
/// (total runs = 1 initial + `policy.retries`). HTTP error statuses are not
/// transport errors and are returned to the caller on the first attempt.
pub async fn with_retry<F, Fut, T>(mut operation: F, policy: RetryPolicy) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt > policy.retries => return Err(err.into()),
            Err(err) => {
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, policy.retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;
            }
        }
    }
}

/// Converts a provider's float into a decimal rounded to `dp` places.
pub fn to_decimal(value: f64, dp: u32) -> anyhow::Result<rust_decimal::Decimal> {
    rust_decimal::Decimal::try_from(value)
        .map(|d| d.round_dp(dp))
        .map_err(|e| anyhow::anyhow!("Invalid number {value}: {e}"))
}
