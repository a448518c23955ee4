//! DocuPipe desktop client library
//!
//! - [`api`]: typed DocuPipe HTTP client with retries and a circuit breaker
//! - [`transfer`]: bounded-concurrency folder upload and dataset download
//! - [`config`]: per-user directories and API-key storage
//! - [`release`]: build, archive and publish desktop bundles
//!
//! The `docupipe` binary is a thin wrapper around [`cli::run`].

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod release;
pub mod transfer;

// Re-export commonly used types
pub use error::{CliError, DesktopError, Result};
