//! Fixed-interval polling with a wall-clock bound and a poll-count bound.

use crate::api::{ApiError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default delay before each status check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default total time allowed for processing to finish.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(900);
/// Default number of status checks.
pub const DEFAULT_MAX_POLLS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// Outcome of one status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Done,
    Pending,
    Failed,
}

/// Sleeps, checks, repeats until `check` reports done or failed.
///
/// Running out of time or polls is a [`ApiError::PollTimeout`]; a failed
/// check is [`ApiError::ProcessingFailed`]; errors from `check` propagate.
pub async fn poll_until<F, Fut>(settings: &PollSettings, what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState>>,
{
    let started = Instant::now();

    for _ in 0..settings.max_polls {
        if started.elapsed() > settings.timeout {
            break;
        }

        tokio::time::sleep(settings.interval).await;

        match check().await? {
            PollState::Done => return Ok(()),
            PollState::Failed => {
                return Err(ApiError::ProcessingFailed {
                    what: what.to_string(),
                });
            }
            PollState::Pending => {}
        }
    }

    Err(ApiError::PollTimeout {
        what: what.to_string(),
        secs: started.elapsed().as_secs(),
    })
}
