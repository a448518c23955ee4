//! Command execution, one module per subcommand.

mod catalog;
mod config;
mod download;
mod logs;
mod publish;
mod upload;

use super::RuntimeConfig;
use super::args::Command;
use crate::error::Result;
use crate::transfer::TransferReport;
use tokio_util::sync::CancellationToken;

/// Exit code when a transfer finished but some items failed.
pub const EXIT_PARTIAL: i32 = 2;

/// Runs `command` and returns the process exit code.
pub async fn execute(command: Command, runtime: &RuntimeConfig) -> Result<i32> {
    match command {
        Command::Config(cmd) => config::execute(cmd, runtime),
        Command::Datasets => catalog::datasets(runtime).await,
        Command::Schemas => catalog::schemas(runtime).await,
        Command::Upload(args) => upload::execute(args, runtime).await,
        Command::Download(args) => download::execute(args, runtime).await,
        Command::Logs(args) => logs::execute(args, runtime),
        Command::Publish(args) => publish::execute(args, runtime).await,
    }
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c(runtime: &RuntimeConfig) -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    let output = runtime.output().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; cancelling outstanding work");
            output.warn("Interrupted; finishing in-flight requests and stopping");
            child.cancel();
        }
    });
    token
}

/// Prints failures and maps the report to an exit code.
fn report_exit_code(report: &TransferReport, runtime: &RuntimeConfig) -> i32 {
    if report.is_clean() {
        return 0;
    }
    if let Some(path) = runtime.log_path() {
        runtime
            .output()
            .warn(&format!("Details are in the log file: {}", path.display()));
    }
    EXIT_PARTIAL
}
