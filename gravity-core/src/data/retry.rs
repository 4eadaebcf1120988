//! Bounded retry with exponential backoff.
//!
//! The policy is a plain value composed around a call: it decides how many
//! attempts to make and how long to wait between them, and returns the last
//! error once the budget is spent. Permanent failures are never retried.

use super::provider::FetchError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further failure.
    pub base_delay_ms: u64,
    /// Ceiling on any single wait.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    /// 4 attempts, waits of 2s, 4s, 8s (capped at 10s).
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 2_000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// No retries at all. Useful for listing probes and tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before attempt `failed_attempts + 1`, given `failed_attempts >= 1`.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(31);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let wait = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "transient fetch failure, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
