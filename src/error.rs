//! Top-level error types for the desktop client.
//!
//! Module errors (API, transfer, release, config) are folded into
//! [`DesktopError`], which also carries recovery suggestions for the CLI.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, DesktopError>;

/// Main error type for all client operations
#[derive(Error, Debug)]
pub enum DesktopError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local configuration errors
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// DocuPipe API errors
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    /// Release pipeline errors
    #[error("Release error: {0}")]
    Release(#[from] crate::release::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// No API key available from flags, environment or config file
    #[error("No API key configured")]
    MissingApiKey,
}

impl DesktopError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Self::Cli(CliError::MissingApiKey) => vec![
                "Save a key with: docupipe config set-key <KEY>".to_string(),
                "Or export DOCUPIPE_API_KEY for this shell".to_string(),
                "Get your API key at https://www.docupipe.ai/settings/general".to_string(),
            ],
            Self::Api(e) if e.is_unauthorized() => vec![
                "The API key was rejected; check it with: docupipe config show".to_string(),
            ],
            Self::Api(e) if e.is_transient() => vec![
                "The service did not respond in time; try again in a few minutes".to_string(),
            ],
            Self::Release(crate::release::Error::MissingToken) => vec![
                "Export GITHUB_TOKEN or pass --token".to_string(),
            ],
            Self::Release(crate::release::Error::BuildFailed { .. }) => vec![
                "The previous release was left untouched; fix the build and re-run".to_string(),
            ],
            _ => vec!["Check the log file for specific details".to_string()],
        }
    }

    /// Check if retrying the same command later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            Self::Cli(_) | Self::Config(_) | Self::Json(_) => false,
            _ => true,
        }
    }
}
