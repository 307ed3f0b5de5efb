use std::sync::Arc;

use courier_protocol::types::{ListFilesResponse, RemoteFile};
use courier_transfer::TransferRegistry;
use tracing::debug;

use crate::error::TransferError;

/// Client for one courier server.
///
/// Cheap to share behind an `Arc`; all operations take `&self`. Transfers
/// report into the client's [`TransferRegistry`], which presentation
/// layers read via [`registry`](Client::registry).
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) registry: Arc<TransferRegistry>,
}

impl Client {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            registry: Arc::new(TransferRegistry::new()),
        })
    }

    /// Shares this client's transfer registry.
    pub fn registry(&self) -> Arc<TransferRegistry> {
        Arc::clone(&self.registry)
    }

    /// Lists the files stored on the server.
    pub async fn list_files(&self) -> Result<Vec<RemoteFile>, TransferError> {
        let resp = self
            .http
            .get(format!("{}/files", self.base_url))
            .send()
            .await?;
        let resp = check_status(resp)?;
        let list: ListFilesResponse = resp.json().await?;
        debug!(count = list.files.len(), "listed remote files");
        Ok(list.files)
    }

    /// Deletes a stored file.
    pub async fn delete(&self, file_id: &str) -> Result<(), TransferError> {
        let resp = self
            .http
            .delete(format!("{}/delete/{}", self.base_url, file_id))
            .send()
            .await?;
        check_status(resp)?;
        debug!(id = %file_id, "deleted remote file");
        Ok(())
    }

    /// Fetches a stored text payload in one request, without progress
    /// tracking. Used by presentation layers for clipboard-style preview
    /// of small text files.
    pub async fn fetch_text(&self, file_id: &str) -> Result<String, TransferError> {
        let resp = self
            .http
            .get(format!("{}/download/{}", self.base_url, file_id))
            .send()
            .await?;
        let resp = check_status(resp)?;
        Ok(resp.text().await?)
    }
}

/// Converts a non-success status into [`TransferError::Server`].
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TransferError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(TransferError::Server {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{error_response, json_response, mock_server};

    #[tokio::test]
    async fn list_files_parses_response() {
        let json = r#"{"files":[
            {"file_id":"f1","filename":"a.bin","size":10},
            {"file_id":"f2","filename":"b.txt","size":3,"type":"text"}
        ]}"#;
        let (url, captured, handle) = mock_server(vec![json_response(json)]).await;

        let client = Client::new(url).unwrap();
        let files = client.list_files().await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_id, "f1");
        assert_eq!(files[1].kind.as_deref(), Some("text"));

        let requests = captured.lock().unwrap();
        assert!(requests[0].head.starts_with("GET /files"));
        handle.abort();
    }

    #[tokio::test]
    async fn delete_hits_delete_endpoint() {
        let (url, captured, handle) =
            mock_server(vec![json_response(r#"{"message":"deleted"}"#)]).await;

        let client = Client::new(url).unwrap();
        client.delete("f1").await.unwrap();

        let requests = captured.lock().unwrap();
        assert!(requests[0].head.starts_with("DELETE /delete/f1"));
        handle.abort();
    }

    #[tokio::test]
    async fn delete_missing_file_is_server_error() {
        let (url, _captured, handle) = mock_server(vec![error_response(404)]).await;

        let client = Client::new(url).unwrap();
        let err = client.delete("nope").await.unwrap_err();
        assert!(matches!(err, TransferError::Server { status: 404 }));
        handle.abort();
    }

    #[tokio::test]
    async fn fetch_text_returns_body() {
        let body = "hello clipboard";
        let resp = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (url, _captured, handle) = mock_server(vec![resp]).await;

        let client = Client::new(url).unwrap();
        let text = client.fetch_text("f1").await.unwrap();
        assert_eq!(text, "hello clipboard");
        handle.abort();
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = Client::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
