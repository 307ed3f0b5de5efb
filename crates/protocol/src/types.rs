use serde::{Deserialize, Serialize};

/// One stored file as returned by `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    /// Payload kind (`"file"` or `"text"`); older servers omit it.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response body of `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub files: Vec<RemoteFile>,
}

/// Response body of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Assembly state reported by a chunk acknowledgment.
///
/// The server may report `Completed` on any chunk, not only the last one
/// (for instance when it already holds the remaining data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Pending,
    Completed,
}

/// Response body of `POST /upload-chunk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkUploadResponse {
    pub status: ChunkStatus,
    pub file_id: String,
}
