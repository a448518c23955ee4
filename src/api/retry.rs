//! Retry with exponential backoff and a circuit breaker.
//!
//! Each attempt is an async closure. Retryable failures (see
//! [`ApiError::is_retryable`]) sleep `min(factor * 2^(attempt-1), max_backoff)`
//! before the next attempt. If the cumulative sleep would pass
//! `2 * max_backoff` the breaker trips and the request fails.

use super::error::{ApiError, Result};
use std::future::Future;
use std::time::Duration;

/// Default number of attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 10;
/// Default backoff factor.
pub const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_secs(2);
/// Default cap on a single backoff sleep.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(600);
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(40);

/// Retry configuration shared by all requests of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let sleep = self.backoff_factor.saturating_mul(1u32 << exp);
        sleep.min(self.max_backoff)
    }

    /// Total sleep allowed across all attempts.
    pub fn circuit_breaker_limit(&self) -> Duration {
        self.max_backoff.saturating_mul(2)
    }

    /// Runs `attempt_fn` until it succeeds, fails permanently, exhausts the
    /// attempts or trips the breaker.
    ///
    /// `method` and `url` are only used for logging and error messages.
    pub async fn run<T, F, Fut>(&self, method: &str, url: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.max_retries.max(1);
        let limit = self.circuit_breaker_limit();
        let mut total_sleep = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            log::warn!(
                "Request {} {} attempt={} failed: {}. Will retry...",
                method,
                url,
                attempt,
                err
            );

            if attempt >= max_retries {
                log::error!(
                    "Exhausted retries for {} {}, last error: {}. Failing permanently.",
                    method,
                    url,
                    err
                );
                return Err(err);
            }

            let sleep = self.backoff_for(attempt);
            if total_sleep + sleep > limit {
                log::error!(
                    "Circuit breaker triggered: total sleep time {}s would exceed limit of {}s.",
                    (total_sleep + sleep).as_secs(),
                    limit.as_secs()
                );
                return Err(ApiError::CircuitBreaker {
                    method: method.to_string(),
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            tokio::time::sleep(sleep).await;
            total_sleep += sleep;
        }
    }
}
