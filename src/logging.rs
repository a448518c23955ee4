//! Per-run log files.
//!
//! Every invocation writes a fresh `docupipe_YYYYMMDD_HHMMSS.log` into the
//! logs directory. With `verbose` the same lines are mirrored to stderr.
//! `RUST_LOG` overrides the default `info` level.

use chrono::Local;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Number of log files kept in the logs directory.
pub const KEEP_LOG_FILES: usize = 30;

const LOG_PREFIX: &str = "docupipe_";
const LOG_SUFFIX: &str = ".log";

/// Writer that copies every line to a file and optionally to stderr.
struct TeeWriter {
    file: Option<File>,
    mirror_stderr: bool,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        if self.mirror_stderr {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        if self.mirror_stderr {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

/// Builds the log file name for a run starting now.
pub fn log_file_name() -> String {
    format!(
        "{}{}{}",
        LOG_PREFIX,
        Local::now().format("%Y%m%d_%H%M%S"),
        LOG_SUFFIX
    )
}

/// Initializes the global logger.
///
/// Returns the path of the log file, or `None` when the file could not be
/// created (logging then falls back to stderr only).
pub fn init(logs_dir: Option<&Path>, verbose: bool) -> Option<PathBuf> {
    let log_path = logs_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        Some(dir.join(log_file_name()))
    });

    let file = log_path.as_ref().and_then(|path| match File::create(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: cannot create log file {}: {}", path.display(), e);
            None
        }
    });
    let log_path = if file.is_some() { log_path } else { None };

    let writer = TeeWriter {
        mirror_stderr: verbose || file.is_none(),
        file,
    };

    let default_level = if log_path.is_some() || verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "{} {} [{}:{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            record.args()
        )
    })
    .target(env_logger::Target::Pipe(Box::new(writer)))
    .try_init();

    if let Some(dir) = logs_dir {
        prune_old_logs(dir, KEEP_LOG_FILES);
    }

    log_path
}

/// Deletes all but the `keep` newest log files. Failures are ignored.
pub fn prune_old_logs(logs_dir: &Path, keep: usize) {
    let mut logs = list_logs(logs_dir);
    if logs.len() <= keep {
        return;
    }
    let excess = logs.len() - keep;
    for old in logs.drain(..excess) {
        if let Err(e) = std::fs::remove_file(&old) {
            log::debug!("Could not remove old log {}: {}", old.display(), e);
        }
    }
}

/// Lists log files, oldest first.
///
/// Names embed a sortable timestamp, so lexical order is chronological.
pub fn list_logs(logs_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(logs_dir) else {
        return Vec::new();
    };

    let mut logs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_PREFIX) && n.ends_with(LOG_SUFFIX))
        })
        .collect();
    logs.sort();
    logs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_name_is_timestamped() {
        let name = log_file_name();
        assert!(name.starts_with("docupipe_"));
        assert!(name.ends_with(".log"));
        // docupipe_ + YYYYMMDD_HHMMSS + .log
        assert_eq!(name.len(), 9 + 15 + 4);
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(
                dir.path().join(format!("docupipe_2024010{}_000000.log", i)),
                "x",
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("unrelated.txt"), "keep me").unwrap();

        prune_old_logs(dir.path(), 2);

        let remaining = list_logs(dir.path());
        assert_eq!(remaining.len(), 2);
        assert!(remaining[0].ends_with("docupipe_20240103_000000.log"));
        assert!(remaining[1].ends_with("docupipe_20240104_000000.log"));
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn list_logs_of_missing_dir_is_empty() {
        assert!(list_logs(Path::new("/definitely/not/here")).is_empty());
    }
}
