//! Minimal mock HTTP server for exercising the reqwest client in tests.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One captured request: raw header block plus body bytes.
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// True if the multipart body carries a field with this name.
    pub fn has_field(&self, name: &str) -> bool {
        let needle = format!("name=\"{name}\"");
        self.body_text().contains(&needle)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Starts a mock server that answers one connection per canned response,
/// in order, capturing each request as it arrives.
pub async fn mock_server(
    responses: Vec<String>,
) -> (
    String,
    Arc<Mutex<Vec<CapturedRequest>>>,
    tokio::task::JoinHandle<()>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}");

    let captured = Arc::new(Mutex::new(Vec::new()));
    let captured_task = Arc::clone(&captured);

    let handle = tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            captured_task.lock().unwrap().push(request);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (url, captured, handle)
}

/// Reads a full request: headers, then as many body bytes as the
/// `Content-Length` header declares (zero when absent).
pub async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    loop {
        if let Some(end) = header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let body_len = content_length(&head);
            if buf.len() >= end + 4 + body_len {
                let body = buf[end + 4..end + 4 + body_len].to_vec();
                return CapturedRequest { head, body };
            }
        }
        let n = stream.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            let end = header_end(&buf).unwrap_or(buf.len());
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let body = buf.get(end + 4..).unwrap_or_default().to_vec();
            return CapturedRequest { head, body };
        }
        buf.extend_from_slice(&tmp[..n]);
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

/// 200 response with a JSON body.
pub fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Response with the given error status and an empty body.
pub fn error_response(status: u16) -> String {
    format!("HTTP/1.1 {status} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
}
