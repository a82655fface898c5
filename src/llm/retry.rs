use anyhow::Result;
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

/// Backoff policy for model calls.
///
/// Only transient failures (network, rate limits, 5xx, overload) are
/// retried; anything else surfaces immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled per attempt
    pub base_delay: Duration,
    /// Upper bound on the per-attempt delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        std::cmp::min(self.base_delay * 2u32.saturating_pow(attempt), self.max_delay)
    }

    /// Run `operation`, retrying transient failures with exponential backoff.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(what, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Heuristic check for transient errors worth retrying.
pub fn is_transient(error: &anyhow::Error) -> bool {
    let text = error.to_string().to_lowercase();

    let markers = [
        "connection",
        "timeout",
        "timed out",
        "network",
        "rate limit",
        "too many requests",
        "429",
        "500",
        "502",
        "503",
        "504",
        "internal server error",
        "bad gateway",
        "service unavailable",
        "overloaded",
        "capacity",
    ];

    markers.iter().any(|m| text.contains(m))
}
