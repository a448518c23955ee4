//! Wire types for the DocuPipe API.

use serde::{Deserialize, Serialize};

/// A document in a dataset listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    pub filename: String,
    #[serde(default)]
    pub file_extension: String,
}

/// A user-defined extraction schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub schema_name: String,
    pub schema_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DatasetNames {
    pub dataset_names: Vec<String>,
}

/// Processing state of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Completed,
    Failed,
    /// Any other value, including a missing status
    Pending(String),
}

impl DocumentStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            other => Self::Pending(other.unwrap_or_default().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    pub document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StandardizeResponse {
    #[serde(default)]
    pub standardization_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UrlResponse {
    pub url: Option<String>,
}

/// Standardization result attached to a document.
#[derive(Debug, Clone, Deserialize)]
pub struct Standardization {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadFile<'a> {
    pub contents: String,
    pub filename: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadDocument<'a> {
    pub file: UploadFile<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadRequest<'a> {
    pub dataset: &'a str,
    pub document: UploadDocument<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StandardizeRequest<'a> {
    pub document_ids: &'a [String],
    pub schema_id: &'a str,
}
