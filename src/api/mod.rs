//! Typed async client for the DocuPipe HTTP API.
//!
//! All requests go through [`RetryPolicy::run`]; JSON bodies are serialized
//! once and shared across attempts.

mod error;
mod models;
mod retry;

pub use error::{ApiError, RETRYABLE_STATUSES, Result};
pub use models::{Document, DocumentStatus, Schema, Standardization};
pub use retry::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
    RetryPolicy,
};

use base64::Engine;
use bytes::Bytes;
use models::{
    DatasetNames, StandardizeRequest, StandardizeResponse, StatusResponse, UploadDocument,
    UploadFile, UploadRequest, UploadResponse, UrlResponse,
};
use reqwest::{Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://app.docupipe.ai";

/// Timeout for document upload requests.
pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(100);
/// Timeout for status polling and standardization requests.
pub const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for document listings.
pub const DOCUMENT_PAGE_LIMIT: usize = 20_000;
/// Upper bound on listing pages.
pub const MAX_DOCUMENT_PAGES: usize = 500;

const API_KEY_HEADER: &str = "X-API-Key";
const MAX_ERROR_BODY: usize = 500;

/// DocuPipe API client.
#[derive(Debug, Clone)]
pub struct DocuPipeClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl DocuPipeClient {
    /// Creates a client for `base_url` authenticated with `api_key`.
    pub fn new(base_url: &str, api_key: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("docupipe-desktop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::transport("BUILD", base_url, e))?;

        Ok(Self {
            http,
            base_url: base,
            api_key: api_key.into(),
            retry,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends one request with retries and returns the body of a 2xx response.
    async fn fetch(
        &self,
        method: Method,
        url: &Url,
        body: Option<Bytes>,
        timeout: Duration,
        authenticated: bool,
    ) -> Result<Bytes> {
        let method_str = method.as_str().to_string();
        let url_str = url.to_string();

        self.retry
            .run(&method_str, &url_str, |_| {
                let mut request = self
                    .http
                    .request(method.clone(), url.clone())
                    .timeout(timeout)
                    .header(header::ACCEPT, "application/json");
                if authenticated {
                    request = request.header(API_KEY_HEADER, &self.api_key);
                }
                if let Some(body) = body.clone() {
                    request = request
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(body);
                }
                let method_str = &method_str;
                let url_str = &url_str;

                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| ApiError::transport(method_str, url_str, e))?;
                    let status = response.status();
                    if !status.is_success() {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::status(
                            method_str,
                            url_str,
                            status,
                            truncate(&text, MAX_ERROR_BODY),
                        ));
                    }
                    response
                        .bytes()
                        .await
                        .map_err(|e| ApiError::transport(method_str, url_str, e))
                }
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, timeout: Duration) -> Result<T> {
        let body = self.fetch(Method::GET, &url, None, timeout, true).await?;
        decode(&url, &body)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        payload: &B,
        timeout: Duration,
    ) -> Result<T> {
        let encoded = serde_json::to_vec(payload).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: format!("cannot encode request: {}", e),
        })?;
        let body = self
            .fetch(Method::POST, &url, Some(Bytes::from(encoded)), timeout, true)
            .await?;
        decode(&url, &body)
    }

    /// Lists the names of all datasets in the account.
    pub async fn list_dataset_names(&self) -> Result<Vec<String>> {
        let url = self.endpoint("dataset-names", &[])?;
        let names: DatasetNames = self.get_json(url, self.retry.request_timeout).await?;
        Ok(names.dataset_names)
    }

    /// Lists extraction schemas.
    pub async fn list_schemas(&self) -> Result<Vec<Schema>> {
        let url = self.endpoint(
            "schemas",
            &[("limit", "1000"), ("offset", "0"), ("exclude_payload", "true")],
        )?;
        self.get_json(url, self.retry.request_timeout).await
    }

    /// Lists every document of a dataset, following pagination.
    pub async fn list_documents(&self, dataset: &str) -> Result<Vec<Document>> {
        self.list_documents_paged(dataset, DOCUMENT_PAGE_LIMIT).await
    }

    /// Paginated listing with an explicit page size.
    pub async fn list_documents_paged(&self, dataset: &str, limit: usize) -> Result<Vec<Document>> {
        log::info!("Listing all documents for dataset='{}'", dataset);
        let limit = limit.max(1);
        let limit_str = limit.to_string();
        let mut offset = 0usize;
        let mut documents = Vec::new();

        for page in 0..MAX_DOCUMENT_PAGES {
            log::debug!("Fetching document page {} (offset {})", page + 1, offset);
            let offset_str = offset.to_string();
            let url = self.endpoint(
                "documents",
                &[
                    ("dataset", dataset),
                    ("limit", &limit_str),
                    ("offset", &offset_str),
                    ("exclude_payload", "true"),
                ],
            )?;
            let batch: Vec<Document> = self.get_json(url, self.retry.request_timeout).await?;
            if batch.is_empty() {
                break;
            }
            let short_page = batch.len() < limit;
            documents.extend(batch);
            offset += limit;
            if short_page {
                break;
            }
        }

        log::info!("Total documents fetched: {}", documents.len());
        Ok(documents)
    }

    /// Uploads a file's bytes into a dataset and returns the new document id.
    pub async fn upload_document(&self, dataset: &str, filename: &str, contents: &[u8]) -> Result<String> {
        let url = self.endpoint("document", &[])?;
        let payload = UploadRequest {
            dataset,
            document: UploadDocument {
                file: UploadFile {
                    contents: base64::engine::general_purpose::STANDARD.encode(contents),
                    filename,
                },
            },
        };
        let response: UploadResponse = self.post_json(url, &payload, UPLOAD_REQUEST_TIMEOUT).await?;
        response
            .document_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::MissingField {
                field: "documentId",
                context: filename.to_string(),
            })
    }

    /// Reads the processing status of a document.
    pub async fn document_status(&self, document_id: &str) -> Result<DocumentStatus> {
        let url = self.endpoint(&format!("document/{}", document_id), &[])?;
        let response: StatusResponse = self.get_json(url, POLL_REQUEST_TIMEOUT).await?;
        Ok(DocumentStatus::parse(response.status.as_deref()))
    }

    /// Starts standardization of documents with a schema.
    pub async fn standardize(&self, document_ids: &[String], schema_id: &str) -> Result<Vec<String>> {
        let url = self.endpoint("v2/standardize/batch", &[])?;
        let payload = StandardizeRequest {
            document_ids,
            schema_id,
        };
        let response: StandardizeResponse = self.post_json(url, &payload, POLL_REQUEST_TIMEOUT).await?;
        if response.standardization_ids.is_empty() {
            return Err(ApiError::MissingField {
                field: "standardizationId",
                context: format!("documents {:?}", document_ids),
            });
        }
        Ok(response.standardization_ids)
    }

    /// Returns whether a standardization exists yet; 404 means not yet.
    pub async fn standardization_ready(&self, standardization_id: &str) -> Result<bool> {
        let url = self.endpoint(&format!("standardization/{}", standardization_id), &[])?;
        match self
            .fetch(Method::GET, &url, None, POLL_REQUEST_TIMEOUT, true)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Gets a short-lived download URL for a document's searchable PDF.
    pub async fn ocr_download_url(&self, document_id: &str) -> Result<String> {
        let url = self.endpoint(
            &format!("document/{}/download/ocr-url", document_id),
            &[("hours", "6")],
        )?;
        let response: UrlResponse = self.get_json(url, self.retry.request_timeout).await?;
        response
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::MissingField {
                field: "download URL",
                context: document_id.to_string(),
            })
    }

    /// Lists standardizations of a document, newest first.
    pub async fn standardizations(&self, document_id: &str) -> Result<Vec<Standardization>> {
        let url = self.endpoint(
            "standardizations",
            &[
                ("document_id", document_id),
                ("limit", "20"),
                ("offset", "0"),
                ("exclude_payload", "false"),
            ],
        )?;
        self.get_json(url, self.retry.request_timeout).await
    }

    /// Streams an unauthenticated URL into `dest`.
    ///
    /// Data goes to a uniquely named `.<name>.<random>.part` file beside
    /// `dest` and is renamed into place on success. The temporary file is
    /// removed when the transfer fails or its future is dropped, so
    /// concurrent transfers never share one and a cancelled download leaves
    /// nothing behind.
    pub async fn download_to_file(&self, source: &str, dest: &Path) -> Result<u64> {
        let url = Url::parse(source).map_err(|e| ApiError::InvalidUrl {
            url: source.to_string(),
            reason: e.to_string(),
        })?;
        let part = part_file(dest)?;
        let part_path = part.path().to_path_buf();
        let url_str = url.to_string();

        let written = self
            .retry
            .run("GET", &url_str, |_| {
                let request = self.http.get(url.clone()).timeout(self.retry.request_timeout);
                let part_path = part_path.clone();
                let url_str = &url_str;
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| ApiError::transport("GET", url_str, e))?;
                    let status = response.status();
                    if !status.is_success() {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::status("GET", url_str, status, truncate(&text, MAX_ERROR_BODY)));
                    }

                    // Truncates whatever an earlier attempt left
                    let mut file = tokio::fs::File::create(&part_path).await.map_err(|source| ApiError::Io {
                        action: "create",
                        path: part_path.display().to_string(),
                        source,
                    })?;
                    let mut response = response;
                    let mut written = 0u64;
                    while let Some(chunk) = response
                        .chunk()
                        .await
                        .map_err(|e| ApiError::transport("GET", url_str, e))?
                    {
                        file.write_all(&chunk).await.map_err(|source| ApiError::Io {
                            action: "write",
                            path: part_path.display().to_string(),
                            source,
                        })?;
                        written += chunk.len() as u64;
                    }
                    file.flush().await.map_err(|source| ApiError::Io {
                        action: "flush",
                        path: part_path.display().to_string(),
                        source,
                    })?;
                    Ok(written)
                }
            })
            .await?;

        part.persist(dest).map_err(|e| ApiError::Io {
            action: "rename",
            path: dest.display().to_string(),
            source: e.error,
        })?;
        Ok(written)
    }
}

/// Creates the temporary download file for `dest` in the same directory.
fn part_file(dest: &Path) -> Result<tempfile::NamedTempFile> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".part")
        .rand_bytes(8)
        .tempfile_in(dir)
        .map_err(|source| ApiError::Io {
            action: "create",
            path: dest.display().to_string(),
            source,
        })
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}
