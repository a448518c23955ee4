//! `download`: fetch a dataset's processed results.

use super::{cancel_on_ctrl_c, report_exit_code};
use crate::cli::RuntimeConfig;
use crate::cli::args::DownloadArgs;
use crate::cli::progress::BarReporter;
use crate::error::Result;
use crate::transfer::{DownloadOptions, TransferSettings, download_dataset};

pub async fn execute(args: DownloadArgs, runtime: &RuntimeConfig) -> Result<i32> {
    let client = runtime.client()?;
    let output = runtime.output();
    output.progress(&format!(
        "Downloading dataset '{}' to {}",
        args.dataset.trim(),
        args.output.display()
    ));

    let options = DownloadOptions {
        dataset: args.dataset.trim().to_string(),
        output_dir: args.output,
    };
    let settings = TransferSettings::default().with_workers(args.transfer.workers);

    let cancel = cancel_on_ctrl_c(runtime);
    let mut reporter = BarReporter::new("documents", output.clone());
    let report = download_dataset(&client, &options, &settings, &mut reporter, &cancel).await?;
    Ok(report_exit_code(&report, runtime))
}
