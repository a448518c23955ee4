//! Command line interface for the DocuPipe desktop client.
//!
//! Parses arguments, opens the per-run log file, dispatches to a command and
//! renders failures with recovery suggestions.

mod args;
pub mod commands;
mod output;
mod progress;
mod retry_config;

pub use args::{Args, Command, ConfigCommand, DownloadArgs, LogsArgs, PublishArgs, TransferArgs, UploadArgs};
pub use output::OutputManager;
pub use progress::BarReporter;
pub use retry_config::RetryArgs;

use crate::api::{DocuPipeClient, RetryPolicy};
use crate::config::{ApiKeyStore, AppPaths, effective_api_key};
use crate::error::{CliError, DesktopError, Result};
use std::path::{Path, PathBuf};

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: OutputManager,
    paths: AppPaths,
    log_path: Option<PathBuf>,
    api_key: Option<String>,
    api_url: String,
    retry: RetryPolicy,
}

impl RuntimeConfig {
    pub fn new(args: &Args, paths: AppPaths, log_path: Option<PathBuf>) -> Self {
        Self {
            output: OutputManager::new(args.quiet),
            paths,
            log_path,
            api_key: args.api_key.clone(),
            api_url: args.api_url.trim().to_string(),
            retry: args.retry.policy(),
        }
    }

    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Log file of this run, if one could be created
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Key given on the command line or in the environment
    pub fn explicit_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// API client using the effective key.
    pub fn client(&self) -> Result<DocuPipeClient> {
        let store = ApiKeyStore::new(&self.paths);
        let key = effective_api_key(self.explicit_api_key(), &store).ok_or(CliError::MissingApiKey)?;
        Ok(DocuPipeClient::new(&self.api_url, key, self.retry.clone())?)
    }
}

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let paths = AppPaths::resolve()?;
    let log_path = crate::logging::init(Some(&paths.logs_dir()), args.verbose);
    log::info!("docupipe {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = RuntimeConfig::new(&args, paths, log_path);
    match commands::execute(args.command, &runtime).await {
        Ok(code) => {
            log::info!("Finished with exit code {}", code);
            Ok(code)
        }
        Err(e) => {
            log::error!("{} (recoverable: {})", e, e.is_recoverable());
            render_error(&e, &runtime);
            Ok(1)
        }
    }
}

fn render_error(error: &DesktopError, runtime: &RuntimeConfig) {
    let output = runtime.output();
    output.error(&error.to_string());
    for suggestion in error.recovery_suggestions() {
        output.error_detail(&suggestion);
    }
    if let Some(path) = runtime.log_path() {
        output.error_detail(&format!("Log file: {}", path.display()));
    }
}
