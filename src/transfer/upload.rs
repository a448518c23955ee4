//! Folder upload: upload, wait for processing, optionally standardize.

use super::poll::{PollSettings, PollState, poll_until};
use super::{ItemFailure, ProgressReporter, TransferReport, TransferSettings, scan_folder};
use crate::api::{ApiError, DocuPipeClient, DocumentStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// What to upload and where.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub folder: PathBuf,
    pub dataset: String,
    /// Standardize each document with this schema when set
    pub schema_id: Option<String>,
    pub recursive: bool,
}

/// Uploads every supported file in `options.folder`.
///
/// Progress starts at `(0, total)` and advances after each successful file.
/// Failures are reported per file and do not stop the others.
pub async fn upload_folder(
    client: &DocuPipeClient,
    options: &UploadOptions,
    settings: &TransferSettings,
    reporter: &mut dyn ProgressReporter,
    cancel: &CancellationToken,
) -> crate::error::Result<TransferReport> {
    log::info!("Scanning folder: {}", options.folder.display());
    let scan = scan_folder(&options.folder, options.recursive)?;
    let total = scan.allowed.len();

    let mut report = TransferReport {
        total,
        ..Default::default()
    };
    if total == 0 {
        log::info!("No valid files to process; returning early.");
        reporter.finish(&report);
        return Ok(report);
    }

    reporter.start(total);
    reporter.advance(0, total, "");

    log::info!(
        "Beginning parallel processing of {} files. workers={}",
        total,
        settings.workers
    );

    let permits = Arc::new(Semaphore::new(settings.workers.max(1)));
    let mut tasks = JoinSet::new();

    for path in scan.allowed {
        let client = client.clone();
        let permits = permits.clone();
        let cancel = cancel.clone();
        let dataset = options.dataset.clone();
        let schema_id = options.schema_id.clone();
        let poll = settings.poll.clone();

        tasks.spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(ApiError::Cancelled),
                outcome = async {
                    let _permit = permits.acquire_owned().await.map_err(|_| ApiError::Cancelled)?;
                    upload_one(&client, &path, &dataset, schema_id.as_deref(), &poll).await
                } => outcome,
            };
            (path, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (path, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                log::error!("[FILE ERROR] upload task panicked: {}", e);
                report.failed.push(ItemFailure {
                    label: "<unknown>".to_string(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let label = display_name(&path);

        match outcome {
            Ok(document_id) => {
                report.succeeded += 1;
                log::info!(
                    "[FILE DONE] {} docId={} ({}/{})",
                    label,
                    document_id,
                    report.succeeded,
                    total
                );
                reporter.advance(report.succeeded, total, &label);
            }
            Err(ApiError::Cancelled) => {
                report.cancelled += 1;
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("[FILE ERROR] {}: {}", label, message);
                reporter.item_failed(&label, &message);
                report.failed.push(ItemFailure { label, message });
            }
        }
    }

    log::info!(
        "All tasks completed. Processed={}, Skipped={}.",
        report.succeeded,
        total - report.succeeded
    );
    reporter.finish(&report);
    Ok(report)
}

/// Runs the whole pipeline for one file and returns its document id.
async fn upload_one(
    client: &DocuPipeClient,
    path: &Path,
    dataset: &str,
    schema_id: Option<&str>,
    poll: &PollSettings,
) -> crate::api::Result<String> {
    let name = display_name(path);

    log::info!("[UPLOAD START] {}", name);
    let contents = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
        action: "read",
        path: path.display().to_string(),
        source,
    })?;
    let document_id = client
        .upload_document(dataset, &name, &contents)
        .await
        .inspect_err(|e| log::error!("[UPLOAD FAIL] {}: {}", name, e))?;
    log::info!("[UPLOAD SUCCESS] {}, docId={}", name, document_id);

    let doc_id = document_id.as_str();
    poll_until(poll, &format!("doc {}", doc_id), || async move {
        Ok(match client.document_status(doc_id).await? {
            DocumentStatus::Completed => PollState::Done,
            DocumentStatus::Failed => PollState::Failed,
            DocumentStatus::Pending(_) => PollState::Pending,
        })
    })
    .await
    .inspect_err(|e| log::error!("[DOC POLL FAIL] {}: {}", name, e))?;
    log::info!("[DOC COMPLETED] {}, docId={}", name, document_id);

    if let Some(schema_id) = schema_id {
        log::info!(
            "[STANDARDIZE START] {}, docId={}, schema={}",
            name,
            document_id,
            schema_id
        );
        let ids = client
            .standardize(std::slice::from_ref(&document_id), schema_id)
            .await
            .inspect_err(|e| log::error!("[STANDARDIZE FAIL] {}, docId={}: {}", name, document_id, e))?;
        let standardization_id = ids[0].as_str();

        poll_until(poll, &format!("standardization {}", standardization_id), || async move {
            Ok(if client.standardization_ready(standardization_id).await? {
                PollState::Done
            } else {
                PollState::Pending
            })
        })
        .await
        .inspect_err(|e| log::error!("[STANDARDIZE FAIL] {}, docId={}: {}", name, document_id, e))?;
        log::info!(
            "[STANDARDIZE COMPLETE] docId={}, stdId={}",
            document_id,
            standardization_id
        );
    }

    Ok(document_id)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
