use courier_transfer::TransferStatus;
use futures_util::StreamExt;
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_DISPOSITION, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{Client, check_status};
use crate::error::TransferError;

/// Progress cap while the response declares no content length, so the UI
/// never claims completion before the stream actually ends.
const UNKNOWN_LENGTH_CAP: f64 = 95.0;

/// Soft scale for the unknown-length estimate (1 MiB): progress climbs
/// asymptotically toward the cap as bytes arrive.
const UNKNOWN_LENGTH_SCALE: f64 = (1024 * 1024) as f64;

/// Upper bound on buffer preallocation (16 MiB). The declared
/// `Content-Length` is a server-supplied hint, not a promise; the buffer
/// still grows as bytes actually arrive.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

/// A fully received download.
#[derive(Debug, Clone)]
pub struct Download {
    /// Resolved name for saving the payload; see [`Client::download`] for
    /// the precedence order.
    pub filename: String,
    /// The payload bytes.
    pub data: Vec<u8>,
}

impl Client {
    /// Downloads a stored file, streaming the body and reporting progress.
    ///
    /// The transfer is registered `InProgress` at 0 before the request is
    /// dispatched. With a declared `Content-Length` progress is the exact
    /// byte ratio; without one a bounded heuristic capped below 100 is
    /// used until the stream ends.
    ///
    /// Filename precedence: `suggested_filename` if non-empty, then the
    /// `filename*=UTF-8''…` form of `Content-Disposition` (percent-decoded),
    /// then the plain `filename="…"` form, then the literal `"download"`.
    ///
    /// `cancel` aborts the connection mid-stream; the abort is recorded in
    /// the registry exactly like a transport failure and differs only in
    /// error kind. Failed downloads are not retried automatically.
    pub async fn download(
        &self,
        file_id: &str,
        suggested_filename: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Download, TransferError> {
        // Register before dispatch so the UI sees the transfer as soon as
        // it exists.
        let generation = self.registry.begin(file_id);

        let result = self
            .stream_download(file_id, suggested_filename, cancel)
            .await;

        match &result {
            Ok(download) => {
                self.registry.set_status(file_id, TransferStatus::Completed);
                info!(
                    id = %file_id,
                    bytes = download.data.len(),
                    filename = %download.filename,
                    "download complete"
                );
            }
            Err(e) => {
                self.registry.set_status(file_id, TransferStatus::Failed);
                warn!(id = %file_id, error = %e, "download failed");
            }
        }
        self.registry.schedule_clear(file_id, generation);
        result
    }

    async fn stream_download(
        &self,
        file_id: &str,
        suggested_filename: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Download, TransferError> {
        let send = self
            .http
            .get(format!("{}/download/{}", self.base_url, file_id))
            .send();
        let resp = tokio::select! {
            resp = send => resp?,
            _ = cancel.cancelled() => return Err(TransferError::Aborted),
        };
        let resp = check_status(resp)?;

        let total = resp.content_length();
        let filename = resolve_filename(suggested_filename, resp.headers().get(CONTENT_DISPOSITION));

        let mut data = Vec::with_capacity(total.unwrap_or(0).min(PREALLOC_LIMIT) as usize);
        let mut stream = resp.bytes_stream();
        loop {
            // Dropping the stream on cancellation tears down the
            // underlying connection.
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = cancel.cancelled() => return Err(TransferError::Aborted),
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            data.extend_from_slice(&chunk);
            self.registry
                .set_progress(file_id, estimate_progress(data.len() as u64, total));
        }

        if data.is_empty() {
            // Policy: a 200 with zero bytes reads as a broken stream, so
            // empty downloads always fail, even legitimately empty files.
            return Err(TransferError::EmptyPayload);
        }

        self.registry.set_progress(file_id, 100);
        Ok(Download { filename, data })
    }
}

/// Maps received bytes to a progress percentage.
fn estimate_progress(received: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let percent = (received as f64 / total as f64 * 100.0).round();
            percent.min(100.0) as u8
        }
        _ => {
            let received = received as f64;
            (UNKNOWN_LENGTH_CAP * received / (received + UNKNOWN_LENGTH_SCALE)) as u8
        }
    }
}

/// Resolves the artifact filename from caller input and response headers.
///
/// Server-derived names are reduced to their final path component, so a
/// disposition like `filename="../../evil.sh"` or an absolute path cannot
/// steer where the artifact is written.
fn resolve_filename(suggested: Option<&str>, disposition: Option<&HeaderValue>) -> String {
    if let Some(name) = suggested
        && !name.is_empty()
    {
        return name.to_string();
    }
    if let Some(value) = disposition.and_then(|v| v.to_str().ok())
        && let Some(name) = filename_from_disposition(value).as_deref().and_then(sanitize_filename)
    {
        return name;
    }
    "download".to_string()
}

/// Strips any directory structure from an untrusted filename.
fn sanitize_filename(name: &str) -> Option<String> {
    let name = std::path::Path::new(name).file_name()?.to_str()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Extracts a filename from a `Content-Disposition` value.
///
/// The RFC 5987 `filename*=UTF-8''…` form wins over plain `filename="…"`
/// regardless of parameter order.
fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';') {
        let param = param.trim();
        if let Some(rest) = param.strip_prefix("filename*=") {
            if let Some(decoded) = decode_ext_value(rest) {
                return Some(decoded);
            }
        } else if let Some(rest) = param.strip_prefix("filename=") {
            let name = rest.trim().trim_matches('"');
            if !name.is_empty() {
                plain = Some(name.to_string());
            }
        }
    }
    plain
}

/// Decodes an RFC 5987 ext-value: `charset'language'percent-encoded`.
fn decode_ext_value(raw: &str) -> Option<String> {
    let mut parts = raw.trim_matches('"').splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}
