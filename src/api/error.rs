//! Errors returned by the DocuPipe API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Statuses that are retried with backoff.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, timeout or protocol failure before a response arrived
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: StatusCode,
        body: String,
    },

    /// Total backoff would exceed the circuit breaker limit
    #[error("Circuit breaker limit exceeded for {method} {url} after {attempts} attempt(s): {last_error}")]
    CircuitBreaker {
        method: String,
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A required field was absent from an otherwise valid response
    #[error("No {field} returned for {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    /// Processing did not finish within the polling bounds
    #[error("Timeout after {secs}s: {what} never completed")]
    PollTimeout { what: String, secs: u64 },

    /// The service reported a processing failure
    #[error("{what} failed during processing")]
    ProcessingFailed { what: String },

    /// Invalid base URL
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Work was cancelled before it finished
    #[error("Cancelled")]
    Cancelled,

    /// Local file I/O during a transfer
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            Self::Status { status, .. } => RETRYABLE_STATUSES.contains(&status.as_u16()),
            _ => false,
        }
    }

    /// Retryable errors plus a tripped circuit breaker or poll timeout.
    pub fn is_transient(&self) -> bool {
        self.is_retryable() || matches!(self, Self::CircuitBreaker { .. } | Self::PollTimeout { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. }
            if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub(crate) fn status(method: &str, url: &str, status: StatusCode, body: String) -> Self {
        Self::Status {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body,
        }
    }

    pub(crate) fn transport(method: &str, url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            method: method.to_string(),
            url: url.to_string(),
            source,
        }
    }
}
