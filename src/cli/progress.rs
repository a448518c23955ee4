//! Terminal progress bar for transfers.

use super::OutputManager;
use crate::transfer::{ProgressReporter, TransferReport};
use indicatif::{ProgressBar, ProgressStyle};

/// Longest label shown next to the bar.
const MAX_LABEL: usize = 40;

/// Progress bar reporter; hidden in quiet mode or when stderr is not a
/// terminal.
pub struct BarReporter {
    bar: Option<ProgressBar>,
    noun: &'static str,
    output: OutputManager,
}

impl BarReporter {
    /// `noun` names the items, e.g. "files" or "documents"
    pub fn new(noun: &'static str, output: OutputManager) -> Self {
        Self {
            bar: None,
            noun,
            output,
        }
    }
}

fn shorten(label: &str) -> String {
    let count = label.chars().count();
    if count <= MAX_LABEL {
        return label.to_string();
    }
    let tail: String = label.chars().skip(count - (MAX_LABEL - 3)).collect();
    format!("...{}", tail)
}

impl ProgressReporter for BarReporter {
    fn start(&mut self, total: usize) {
        if self.output.is_quiet() {
            return;
        }
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn advance(&mut self, completed: usize, _total: usize, label: &str) {
        if let Some(bar) = &self.bar {
            bar.set_position(completed as u64);
            bar.set_message(shorten(label));
        }
    }

    fn item_failed(&mut self, label: &str, message: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| self.output.error(&format!("{}: {}", label, message))),
            None => self.output.error(&format!("{}: {}", label, message)),
        }
    }

    fn finish(&mut self, report: &TransferReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        if report.total == 0 {
            self.output.warn(&format!("No {} to process", self.noun));
            return;
        }
        let summary = format!("{}/{} {} completed", report.succeeded, report.total, self.noun);
        if report.is_clean() {
            self.output.success(&summary);
        } else {
            self.output.warn(&format!(
                "{}, {} failed, {} cancelled",
                summary,
                report.failed.len(),
                report.cancelled
            ));
        }
    }
}
