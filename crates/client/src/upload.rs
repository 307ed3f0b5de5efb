use courier_protocol::constants::{CHUNK_SIZE, CHUNK_UPLOAD_THRESHOLD};
use courier_protocol::types::{ChunkStatus, ChunkUploadResponse, UploadResponse};
use courier_transfer::{ChunkSpec, TransferStatus, generate_transfer_id, plan_chunks};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::{Client, check_status};
use crate::error::TransferError;

/// A file payload with its original name.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// What to upload: a file, inline text, or both in one request.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<FilePayload>,
    pub text: Option<String>,
}

/// Strategy knobs for [`Client::upload`].
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    /// File payloads above this size take the chunked path.
    pub threshold: u64,
    /// Segment size for chunked dispatch.
    pub chunk_size: u64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            threshold: CHUNK_UPLOAD_THRESHOLD,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Identifier the store knows the payload by.
    pub file_id: String,
    /// Chunk requests dispatched; 0 for single-shot uploads.
    pub chunks_sent: u32,
}

impl Client {
    /// Uploads a payload, choosing the strategy by declared size.
    ///
    /// At or below `options.threshold` the whole payload goes out as one
    /// multipart request. Above it, the payload is split into fixed-size
    /// chunks dispatched strictly sequentially under a client-generated
    /// transfer identifier, with progress reported into the registry after
    /// each acknowledgment. `cancel` is honored between chunks; a chunk
    /// request itself is atomic.
    pub async fn upload(
        &self,
        request: UploadRequest,
        options: UploadOptions,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, TransferError> {
        let has_text = request.text.as_deref().is_some_and(|t| !t.is_empty());
        if request.file.is_none() && !has_text {
            return Err(TransferError::NoPayload);
        }

        if let Some(file) = &request.file
            && file.data.len() as u64 > options.threshold
        {
            return self.upload_chunked(file, options.chunk_size, cancel).await;
        }

        self.upload_single(request).await
    }

    /// Sends the whole payload as one `/upload` request.
    async fn upload_single(&self, request: UploadRequest) -> Result<UploadReceipt, TransferError> {
        let mut form = reqwest::multipart::Form::new();
        if let Some(file) = request.file {
            let part = reqwest::multipart::Part::bytes(file.data).file_name(file.filename);
            form = form.part("file", part);
        }
        if let Some(text) = request.text {
            form = form.text("text", text);
        }

        let resp = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp)?;
        let body: UploadResponse = resp.json().await?;

        debug!(id = %body.file_id, "single-shot upload complete");
        Ok(UploadReceipt {
            file_id: body.file_id,
            chunks_sent: 0,
        })
    }

    /// Splits the payload and dispatches chunks sequentially.
    async fn upload_chunked(
        &self,
        file: &FilePayload,
        chunk_size: u64,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, TransferError> {
        let transfer_id = generate_transfer_id();
        let specs = plan_chunks(file.data.len() as u64, chunk_size);

        let generation = self.registry.begin(&transfer_id);
        info!(
            id = %transfer_id,
            chunks = specs.len(),
            bytes = file.data.len(),
            filename = %file.filename,
            "starting chunked upload"
        );

        let result = self
            .dispatch_chunks(&transfer_id, file, &specs, cancel)
            .await;

        match &result {
            Ok(receipt) => {
                self.registry
                    .set_status(&transfer_id, TransferStatus::Completed);
                info!(id = %transfer_id, file_id = %receipt.file_id, "chunked upload complete");
            }
            Err(e) => {
                // Already-sent chunks are not rolled back; discarding a
                // partial assembly is the server's call.
                self.registry
                    .set_status(&transfer_id, TransferStatus::Failed);
                error!(id = %transfer_id, error = %e, "chunked upload failed");
            }
        }
        self.registry.schedule_clear(&transfer_id, generation);
        result
    }

    async fn dispatch_chunks(
        &self,
        transfer_id: &str,
        file: &FilePayload,
        specs: &[ChunkSpec],
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, TransferError> {
        let total = specs.len() as u32;

        for spec in specs {
            if cancel.is_cancelled() {
                return Err(TransferError::Aborted);
            }

            // Each send awaits its acknowledgment before the next chunk
            // goes out, so ordering and memory stay bounded by construction.
            let ack = self
                .send_chunk(transfer_id, file, spec, total)
                .await
                .map_err(|e| TransferError::ChunkDispatch {
                    index: spec.index,
                    source: Box::new(e),
                })?;

            let done = spec.index + 1;
            let pct = f64::from(done) / f64::from(total) * 100.0;
            self.registry.set_progress(transfer_id, pct.round() as u8);
            debug!(
                id = %transfer_id,
                chunk = spec.index,
                total,
                percent = %format_args!("{pct:.1}"),
                "chunk acknowledged"
            );

            // The server may finish assembly before the nominal last chunk
            // (it already held the rest). Unsent chunks are not an error;
            // stop dispatching and report success.
            if ack.status == ChunkStatus::Completed {
                return Ok(UploadReceipt {
                    file_id: ack.file_id,
                    chunks_sent: done,
                });
            }
        }

        // Every chunk acknowledged as pending: the store knows the payload
        // by the pre-generated transfer identifier.
        Ok(UploadReceipt {
            file_id: transfer_id.to_string(),
            chunks_sent: total,
        })
    }

    async fn send_chunk(
        &self,
        transfer_id: &str,
        file: &FilePayload,
        spec: &ChunkSpec,
        total: u32,
    ) -> Result<ChunkUploadResponse, TransferError> {
        let bytes = spec.slice(&file.data).to_vec();
        let form = reqwest::multipart::Form::new()
            .text("file_id", transfer_id.to_string())
            .text("chunk_index", spec.index.to_string())
            .text("total_chunks", total.to_string())
            .text("filename", file.filename.clone())
            .part(
                "chunk",
                reqwest::multipart::Part::bytes(bytes).file_name(file.filename.clone()),
            );

        let resp = self
            .http
            .post(format!("{}/upload-chunk", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp)?;
        Ok(resp.json().await?)
    }
}
