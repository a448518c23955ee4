//! Errors for the release pipeline, plus context helpers for I/O.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, Error>;

/// Release pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    /// Packaging command failed; nothing was published
    #[error("Build failed: {command} - {reason}")]
    BuildFailed { command: String, reason: String },

    /// Packaging tool is not installed
    #[error("Build tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Archive creation failed
    #[error("Archive failed for {}: {reason}", path.display())]
    ArchiveFailed { path: PathBuf, reason: String },

    /// Release configuration is invalid
    #[error("Invalid release config: {0}")]
    InvalidConfig(String),

    /// No authentication token for the release host
    #[error("No release host token configured")]
    MissingToken,

    /// Release host API failure
    #[error("Release host {operation} failed: {reason}")]
    Host { operation: String, reason: String },

    /// Another publication holds the lock
    #[error("Publication lock for '{label}' unavailable: {reason}")]
    Lock { label: String, reason: String },

    /// Filesystem error with context
    #[error("{context} ({}): {source}", path.display())]
    Fs {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Release notes template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Zip errors
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Free-form error
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    pub(crate) fn host(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Host {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// Adds a path and a description to I/O errors.
pub trait ErrorExt<T> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Turns an `Option` or foreign error into a [`Error::GenericError`].
pub trait Context<T> {
    fn context(self, message: &str) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context(self, message: &str) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(message.to_string()))
    }
}

impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{}: {}", message, e)))
    }
}

/// Returns early with a formatted [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::release::Error::GenericError(format!($($arg)*)))
    };
}
