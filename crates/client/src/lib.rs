//! Async HTTP client for the courier file-transfer server.
//!
//! Small payloads go through the single-shot `/upload` endpoint; larger
//! ones are split into fixed-size chunks dispatched strictly sequentially,
//! with per-acknowledgment progress reported into a shared
//! [`TransferRegistry`]. Downloads stream the body and report byte-level
//! progress into the same registry.

mod client;
mod download;
mod error;
mod upload;

#[cfg(test)]
mod testutil;

pub use client::Client;
pub use download::Download;
pub use error::TransferError;
pub use upload::{FilePayload, UploadOptions, UploadReceipt, UploadRequest};

pub use courier_transfer::{TransferRegistry, TransferSnapshot, TransferStatus};
