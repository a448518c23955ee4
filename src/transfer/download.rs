//! Dataset download: searchable PDF plus standardization JSON per document.

use super::{ItemFailure, ProgressReporter, TransferReport, TransferSettings};
use crate::api::{ApiError, DocuPipeClient, Document};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub dataset: String,
    pub output_dir: PathBuf,
}

/// Downloads every document of a dataset into `options.output_dir`.
///
/// Progress starts at `(0, total)` and advances after every document,
/// successful or not. Documents whose names collide are written under
/// distinct names (see [`assign_stems`]).
pub async fn download_dataset(
    client: &DocuPipeClient,
    options: &DownloadOptions,
    settings: &TransferSettings,
    reporter: &mut dyn ProgressReporter,
    cancel: &CancellationToken,
) -> crate::error::Result<TransferReport> {
    log::info!(
        "Starting download of dataset='{}' to: {}",
        options.dataset,
        options.output_dir.display()
    );
    tokio::fs::create_dir_all(&options.output_dir).await?;

    let documents = client.list_documents(&options.dataset).await?;
    let total = documents.len();
    log::info!("Total docs to download: {}", total);

    let mut report = TransferReport {
        total,
        ..Default::default()
    };
    if total == 0 {
        log::info!("No documents found for this dataset. Returning.");
        reporter.finish(&report);
        return Ok(report);
    }

    reporter.start(total);
    reporter.advance(0, total, "");

    let permits = Arc::new(Semaphore::new(settings.workers.max(1)));
    let output_dir = Arc::new(options.output_dir.clone());
    let mut tasks = JoinSet::new();
    let stems = assign_stems(&documents);

    for (document, stem) in documents.into_iter().zip(stems) {
        let client = client.clone();
        let permits = permits.clone();
        let cancel = cancel.clone();
        let output_dir = output_dir.clone();

        tasks.spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(ApiError::Cancelled),
                outcome = async {
                    let _permit = permits.acquire_owned().await.map_err(|_| ApiError::Cancelled)?;
                    download_one(&client, &document, &stem, &output_dir).await
                } => outcome,
            };
            (document, outcome)
        });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (document, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                log::error!("Download task panicked: {}", e);
                completed += 1;
                report.failed.push(ItemFailure {
                    label: "<unknown>".to_string(),
                    message: e.to_string(),
                });
                reporter.advance(completed, total, "<unknown>");
                continue;
            }
        };
        let label = format!("{} ({})", document.filename, document.document_id);

        match outcome {
            Ok(()) => report.succeeded += 1,
            Err(ApiError::Cancelled) => {
                report.cancelled += 1;
                continue;
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Error downloading document {}: {}", label, message);
                reporter.item_failed(&label, &message);
                report.failed.push(ItemFailure {
                    label: label.clone(),
                    message,
                });
            }
        }

        completed += 1;
        reporter.advance(completed, total, &label);
    }

    log::info!(
        "All downloads completed. Documents processed: {} / {}",
        completed,
        total
    );
    reporter.finish(&report);
    Ok(report)
}

async fn download_one(
    client: &DocuPipeClient,
    document: &Document,
    stem: &str,
    output_dir: &Path,
) -> crate::api::Result<()> {
    let label = format!("{} ({})", document.filename, document.document_id);
    log::info!("Starting download for: {}", label);

    let url = client.ocr_download_url(&document.document_id).await?;
    let pdf_path = output_dir.join(format!("{}.pdf", stem));
    client.download_to_file(&url, &pdf_path).await?;
    log::info!("Downloaded PDF for: {}", label);

    let standardizations = client.standardizations(&document.document_id).await?;
    if let Some(data) = standardizations.into_iter().next().and_then(|s| s.data) {
        let json_path = output_dir.join(format!("{}.json", stem));
        let pretty = serde_json::to_string_pretty(&data).map_err(|e| ApiError::Decode {
            url: json_path.display().to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&json_path, pretty)
            .await
            .map_err(|source| ApiError::Io {
                action: "write",
                path: json_path.display().to_string(),
                source,
            })?;
        log::info!("Downloaded standardization JSON for: {}", label);
    }

    log::info!("Finished download for: {}", label);
    Ok(())
}

/// Local file stems for a listing, in order.
///
/// The first document with a given name keeps [`output_stem`]; later ones
/// get `<stem>_<document id>`. Names are compared case-insensitively since
/// the output folder may live on a case-insensitive filesystem.
pub fn assign_stems(documents: &[Document]) -> Vec<String> {
    let mut taken = HashSet::new();
    documents
        .iter()
        .map(|document| {
            let base = output_stem(document);
            let mut stem = base.clone();
            if taken.contains(&stem.to_lowercase()) {
                let id = sanitize_component(&document.document_id).unwrap_or_default();
                stem = format!("{}_{}", base, id);
                let mut n = 2;
                while taken.contains(&stem.to_lowercase()) {
                    stem = format!("{}_{}_{}", base, id, n);
                    n += 1;
                }
                log::warn!(
                    "Document {} shares the name '{}' with another document; saving as '{}'",
                    document.document_id,
                    base,
                    stem
                );
            }
            taken.insert(stem.to_lowercase());
            stem
        })
        .collect()
}

/// Local file stem for a document: its filename reduced to one safe path
/// component, or the document id when nothing usable remains.
pub fn output_stem(document: &Document) -> String {
    sanitize_component(&document.filename).unwrap_or_else(|| document.document_id.clone())
}

fn sanitize_component(name: &str) -> Option<String> {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(filename: &str) -> Document {
        doc_with_id("doc-1", filename)
    }

    fn doc_with_id(id: &str, filename: &str) -> Document {
        Document {
            document_id: id.into(),
            filename: filename.into(),
            file_extension: "pdf".into(),
        }
    }

    #[test]
    fn stem_keeps_plain_names() {
        assert_eq!(output_stem(&doc("invoice.pdf")), "invoice.pdf");
    }

    #[test]
    fn stem_strips_directories() {
        assert_eq!(output_stem(&doc("../../etc/passwd")), "passwd");
        assert_eq!(output_stem(&doc("C:\\scans\\a.png")), "a.png");
    }

    #[test]
    fn stem_replaces_reserved_characters() {
        assert_eq!(output_stem(&doc("a:b?.pdf")), "a_b_.pdf");
    }

    #[test]
    fn stem_falls_back_to_id() {
        assert_eq!(output_stem(&doc("")), "doc-1");
        assert_eq!(output_stem(&doc("dir/..")), "doc-1");
        assert_eq!(output_stem(&doc("trailing/")), "doc-1");
    }

    #[test]
    fn colliding_names_get_the_document_id() {
        let docs = [
            doc_with_id("d1", "same.pdf"),
            doc_with_id("d2", "same.pdf"),
            doc_with_id("d3", "SAME.pdf"),
            doc_with_id("d4", "other.pdf"),
        ];
        assert_eq!(
            assign_stems(&docs),
            vec!["same.pdf", "same.pdf_d2", "SAME.pdf_d3", "other.pdf"]
        );
    }

    #[test]
    fn suffixed_name_that_is_taken_gets_a_counter() {
        let docs = [
            doc_with_id("d1", "a.pdf"),
            doc_with_id("d2", "a.pdf_d3"),
            doc_with_id("d3", "a.pdf_d3"),
            doc_with_id("d3", "a.pdf"),
        ];
        assert_eq!(
            assign_stems(&docs),
            vec!["a.pdf", "a.pdf_d3", "a.pdf_d3_d3", "a.pdf_d3_2"]
        );
    }
}
