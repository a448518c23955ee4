//! DocuPipe desktop client.
//!
//! Uploads folders for processing, downloads searchable PDFs and JSON
//! results, and publishes desktop release bundles.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = match docupipe_desktop::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  {}", suggestion);
            }
            1
        }
    };

    process::exit(exit_code);
}
