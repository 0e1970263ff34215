use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// Request bodies use snake_case keys, responses come back camelCase.

#[derive(Debug, Clone, Serialize)]
pub struct FileRef {
    pub filename: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRequestPayload {
    pub version_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub primary_file: FileRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expansion_files: Vec<FileRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartUrlRequest {
    pub pending_upload_id: String,
    pub part_number: u32,
    pub content_length: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub pending_upload_id: String,
}

/// Presigned destination for a direct whole-file upload: the URL plus every
/// header the storage backend expects on the PUT.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedData {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Per-file strategy descriptor from the request-urls call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadInfo {
    pub chunked_upload: bool,
    #[serde(default)]
    pub chunked_number_parts: u32,
    #[serde(default)]
    pub chunked_part_size_mb: u64,
    pub presigned_data: Option<PresignedData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequestResponse {
    pub pending_upload_id: String,
    pub primary_file: FileUploadInfo,
    #[serde(default)]
    pub expansion_files: Option<Vec<FileUploadInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUrlResponse {
    pub part_presigned_url: String,
}

/// The verified build record. Built once from the verify response and never
/// mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub build_id: String,
    pub pending_processing: bool,
    pub build_info_url: String,
    pub download_url: String,
}
