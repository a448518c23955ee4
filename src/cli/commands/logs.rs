//! `logs`: list or print recent log files.

use crate::cli::RuntimeConfig;
use crate::cli::args::LogsArgs;
use crate::error::Result;
use crate::logging::list_logs;
use anyhow::Context;

pub fn execute(args: LogsArgs, runtime: &RuntimeConfig) -> Result<i32> {
    let output = runtime.output();
    let logs_dir = runtime.paths().logs_dir();
    // The current run's own file is not interesting
    let logs: Vec<_> = list_logs(&logs_dir)
        .into_iter()
        .filter(|p| Some(p.as_path()) != runtime.log_path())
        .collect();

    if logs.is_empty() {
        output.warn(&format!("No log files in {}", logs_dir.display()));
        return Ok(0);
    }

    if args.show {
        if let Some(newest) = logs.last() {
            let contents = std::fs::read_to_string(newest)
                .with_context(|| format!("reading log file {}", newest.display()))?;
            output.section(&newest.display().to_string());
            output.println(contents.trim_end());
        }
        return Ok(0);
    }

    output.section(&format!("Log files in {}", logs_dir.display()));
    let skip = logs.len().saturating_sub(args.limit);
    for path in &logs[skip..] {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        output.indent(&format!("{}  ({} bytes)", name, size));
    }
    Ok(0)
}
