//! Retry policy for callers above the loader.
//!
//! A single `resolve` never retries; a caller that wants another attempt after
//! an exhausted fallback chain wraps the call in [`with_retry`].

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempts and exponential backoff between them.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Growth factor applied to the wait after each failure
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Active-language load at startup: 1s, 2s, 4s, ... capped at 5s.
    /// Zero attempts is bumped to one.
    pub fn startup(max_attempts: u32) -> Self {
        Self::new(max_attempts.max(1), Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
    }

    /// Wait before the given retry (1-based: the first retry is 1).
    fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::startup(3)
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is reached.
///
/// Returns the first success, or the error of the final attempt.
///
/// # Panics
/// Panics if `config.max_attempts` is 0
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    assert!(
        config.max_attempts >= 1,
        "RetryConfig.max_attempts must be >= 1, got {}",
        config.max_attempts
    );

    let mut last_error = match operation().await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for retry in 1..config.max_attempts {
        let wait = config.backoff(retry);
        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}",
            label, retry, config.max_attempts, last_error, wait
        );
        sleep(wait).await;

        match operation().await {
            Ok(value) => {
                debug!("{}: succeeded on attempt {}", label, retry + 1);
                return Ok(value);
            }
            Err(e) => last_error = e,
        }
    }

    warn!(
        "{}: giving up after {} attempts: {}",
        label, config.max_attempts, last_error
    );
    Err(last_error)
}
