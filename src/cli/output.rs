//! Styled terminal output.
//!
//! Normal output goes to stdout; warnings and errors to stderr. Quiet mode
//! keeps only errors. Write failures (closed pipe) are ignored.

use console::{Style, Term};

/// Output manager for colored terminal output
#[derive(Debug, Clone)]
pub struct OutputManager {
    quiet: bool,
    stdout: Term,
    stderr: Term,
}

impl OutputManager {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            stdout: Term::stdout(),
            stderr: Term::stderr(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn out(&self, line: &str) {
        if !self.quiet {
            let _ = self.stdout.write_line(line);
        }
    }

    /// Plain line, e.g. listing output
    pub fn println(&self, message: &str) {
        self.out(message);
    }

    pub fn section(&self, title: &str) {
        self.out(&Style::new().bold().apply_to(title).to_string());
    }

    pub fn indent(&self, message: &str) {
        self.out(&format!("  {}", message));
    }

    pub fn progress(&self, message: &str) {
        self.out(&format!("{} {}", Style::new().cyan().apply_to("→"), message));
    }

    pub fn success(&self, message: &str) {
        self.out(&format!("{} {}", Style::new().green().bold().apply_to("✓"), message));
    }

    pub fn warn(&self, message: &str) {
        if !self.quiet {
            let _ = self
                .stderr
                .write_line(&format!("{} {}", Style::new().yellow().bold().apply_to("!"), message));
        }
    }

    /// Always printed, quiet or not
    pub fn error(&self, message: &str) {
        let _ = self
            .stderr
            .write_line(&format!("{} {}", Style::new().red().bold().apply_to("✗"), message));
    }

    /// Error detail line, always printed
    pub fn error_detail(&self, message: &str) {
        let _ = self.stderr.write_line(&format!("  {}", message));
    }
}
