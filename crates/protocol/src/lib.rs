//! Wire types and constants for the courier file-transfer API.
//!
//! Field names follow the server's JSON exactly (`file_id`, `chunk_index`,
//! `total_chunks`), so nothing here is renamed.

pub mod constants;
pub mod types;

pub use types::{ChunkStatus, ChunkUploadResponse, ListFilesResponse, RemoteFile, UploadResponse};
