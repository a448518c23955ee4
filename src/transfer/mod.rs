//! Bounded-concurrency upload and download of document sets.
//!
//! Both directions spawn one task per item on a [`JoinSet`](tokio::task::JoinSet),
//! bounded by a semaphore of `workers` permits. Results are collected on the
//! calling task, which is the only place progress is reported from.

mod discovery;
mod download;
mod poll;
mod upload;

pub use discovery::{ALLOWED_EXTENSIONS, FolderScan, is_allowed, scan_folder};
pub use download::{DownloadOptions, download_dataset, output_stem};
pub use poll::{PollSettings, PollState, poll_until};
pub use upload::{UploadOptions, upload_folder};

use std::time::Duration;

/// Default number of items in flight.
pub const DEFAULT_WORKERS: usize = 20;

/// Tuning shared by uploads and downloads.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub workers: usize,
    pub poll: PollSettings,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll: PollSettings::default(),
        }
    }
}

impl TransferSettings {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }
}

/// One failed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub label: String,
    pub message: String,
}

/// Summary of a finished transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<ItemFailure>,
    /// Items that never ran because the transfer was cancelled
    pub cancelled: usize,
}

impl TransferReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.cancelled == 0
    }
}

/// Receives progress from a running transfer.
pub trait ProgressReporter: Send {
    /// Called once with the number of items before any work starts
    fn start(&mut self, total: usize);

    /// Called with the running completed count
    fn advance(&mut self, completed: usize, total: usize, label: &str);

    /// Called once per failed item
    fn item_failed(&mut self, label: &str, message: &str);

    /// Called when the transfer ends
    fn finish(&mut self, report: &TransferReport);
}

/// No-op reporter.
#[derive(Debug, Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start(&mut self, _total: usize) {}

    fn advance(&mut self, _completed: usize, _total: usize, _label: &str) {}

    fn item_failed(&mut self, _label: &str, _message: &str) {}

    fn finish(&mut self, _report: &TransferReport) {}
}
