//! HTTP retry settings exposed as global flags.

use crate::api::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT, RetryPolicy,
};
use std::time::Duration;

#[derive(clap::Args, Debug, Clone)]
pub struct RetryArgs {
    /// Attempts per HTTP request
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Base backoff in seconds, doubled on every retry
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_BACKOFF_FACTOR.as_secs_f64())]
    pub backoff_factor: f64,

    /// Longest single backoff in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_MAX_BACKOFF.as_secs())]
    pub max_backoff: u64,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout: u64,
}

impl RetryArgs {
    /// Converts the flags into a policy; negative or non-finite factors
    /// become zero and factors too large for a `Duration` saturate.
    pub fn policy(&self) -> RetryPolicy {
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor > 0.0 {
            Duration::try_from_secs_f64(self.backoff_factor).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: factor,
            max_backoff: Duration::from_secs(self.max_backoff),
            request_timeout: Duration::from_secs(self.request_timeout.max(1)),
        }
    }
}

impl Default for RetryArgs {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR.as_secs_f64(),
            max_backoff: DEFAULT_MAX_BACKOFF.as_secs(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}
