//! Command line argument parsing and validation.

use super::retry_config::RetryArgs;
use crate::api::DEFAULT_API_URL;
use crate::release::{DEFAULT_LOCK_WAIT, TargetPlatform};
use crate::transfer::DEFAULT_WORKERS;
use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DocuPipe desktop client
#[derive(Parser, Debug)]
#[command(
    name = "docupipe",
    version,
    about = "Upload documents to DocuPipe and download processed results",
    long_about = "Uploads local folders to DocuPipe for processing, downloads searchable PDFs and
standardized JSON for a dataset, and publishes desktop release bundles.

Usage:
  docupipe config set-key <KEY>
  docupipe upload --folder ./scans --dataset invoices --schema \"Invoice v2\"
  docupipe download --dataset invoices --output ./results
  docupipe publish --platform macos

Exit code 0 = everything succeeded, 1 = error, 2 = some files failed."
)]
pub struct Args {
    /// API key; overrides the saved key
    #[arg(long, global = true, env = "DOCUPIPE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// DocuPipe API base URL
    #[arg(long, global = true, env = "DOCUPIPE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub retry: RetryArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the saved API key
    #[command(subcommand)]
    Config(ConfigCommand),

    /// List datasets in the account
    Datasets,

    /// List extraction schemas
    Schemas,

    /// Upload every supported file in a folder
    Upload(UploadArgs),

    /// Download PDFs and JSON results of a dataset
    Download(DownloadArgs),

    /// Show recent log files
    Logs(LogsArgs),

    /// Build, archive and publish the desktop bundle as the latest release
    Publish(PublishArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Save the API key to the config file
    SetKey {
        /// Key from https://www.docupipe.ai/settings/general
        key: String,
    },
    /// Show config locations and the effective key (masked)
    Show,
}

/// Concurrency and polling knobs shared by transfers.
#[derive(clap::Args, Debug, Clone)]
pub struct TransferArgs {
    /// Files processed in parallel
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u16).range(1..=256).map(usize::from))]
    pub workers: usize,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Folder containing documents
    #[arg(short, long, value_name = "DIR")]
    pub folder: PathBuf,

    /// Dataset to upload into
    #[arg(short, long)]
    pub dataset: String,

    /// Standardize with this schema (name or id)
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Include files in subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Seconds between status checks
    #[arg(long, value_name = "SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Dataset to download
    #[arg(short, long)]
    pub dataset: String,

    /// Output folder, created when missing
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

#[derive(clap::Args, Debug)]
pub struct LogsArgs {
    /// Number of most recent files to list
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    /// Print the newest log file's contents instead
    #[arg(long)]
    pub show: bool,
}

#[derive(clap::Args, Debug)]
pub struct PublishArgs {
    /// Repository checkout to build
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Release settings; defaults to <workspace>/release.toml when present
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Platform to build (defaults to the host)
    #[arg(short, long, value_enum)]
    pub platform: Option<TargetPlatform>,

    /// Release label (tag) to replace
    #[arg(long)]
    pub label: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Token with permission to manage releases
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API root
    #[arg(long, env = "GITHUB_API_URL", default_value = crate::release::DEFAULT_GITHUB_API_URL)]
    pub github_api_url: String,

    /// Commit the release points at
    #[arg(long)]
    pub commit: Option<String>,

    /// Seconds to wait for a concurrent publication of the same label
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_LOCK_WAIT.as_secs())]
    pub lock_wait: u64,

    /// Run the whole pipeline against an in-memory release host
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("API URL cannot be empty".to_string());
        }
        match &self.command {
            Command::Upload(upload) if upload.dataset.trim().is_empty() => {
                Err("Dataset name cannot be empty".to_string())
            }
            Command::Download(download) if download.dataset.trim().is_empty() => {
                Err("Dataset name cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}
