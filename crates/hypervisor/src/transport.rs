// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Hand-rolled HTTP/1.1 client over the hypervisor daemon's local Unix
//! domain socket.
//!
//! The LXD-family daemon speaks plain HTTP over `unix.socket` — the same
//! shape of protocol a Docker-compatible daemon speaks over its own Unix
//! socket, just with a different API surface. We frame requests and parse
//! responses by hand here rather than pulling in a full HTTP client crate,
//! the same trade a local-socket sidecar client makes elsewhere in this
//! stack: one socket, one conversation at a time, no connection pooling.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::error::HypervisorError;

/// An HTTP response read off the daemon socket: status code plus body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub struct UnixHttpClient {
    socket_path: std::path::PathBuf,
    timeout: Duration,
}

impl UnixHttpClient {
    pub fn new(socket_path: impl Into<std::path::PathBuf>, timeout: Duration) -> Self {
        Self { socket_path: socket_path.into(), timeout }
    }

    /// The socket this client dials. Exposed so callers that need a raw
    /// connection the hand-rolled request methods don't cover (the
    /// interactive-exec WebSocket upgrade) can open one themselves.
    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    pub async fn get(&self, path: &str) -> Result<RawResponse, HypervisorError> {
        let request = format!("GET {path} HTTP/1.1\r\nHost: lxd\r\nConnection: close\r\n\r\n");
        self.send(&request).await
    }

    pub async fn delete(&self, path: &str) -> Result<RawResponse, HypervisorError> {
        let request = format!("DELETE {path} HTTP/1.1\r\nHost: lxd\r\nConnection: close\r\n\r\n");
        self.send(&request).await
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, HypervisorError> {
        self.body_request("POST", path, body).await
    }

    pub async fn put_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, HypervisorError> {
        self.body_request("PUT", path, body).await
    }

    pub async fn patch_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, HypervisorError> {
        self.body_request("PATCH", path, body).await
    }

    async fn body_request(&self, method: &str, path: &str, body: &serde_json::Value) -> Result<RawResponse, HypervisorError> {
        let payload = serde_json::to_string(body)?;
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: lxd\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
            payload.len()
        );
        self.send(&request).await
    }

    async fn send(&self, request: &str) -> Result<RawResponse, HypervisorError> {
        tokio::time::timeout(self.timeout, self.send_inner(request))
            .await
            .map_err(|_| HypervisorError::Timeout("hypervisor socket request timed out".into()))?
    }

    async fn send_inner(&self, request: &str) -> Result<RawResponse, HypervisorError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            HypervisorError::Unavailable(format!("connect {}: {e}", self.socket_path.display()))
        })?;
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(&mut stream);
        read_http_response(&mut reader).await
    }
}

/// Parse a raw HTTP/1.1 response off any async reader: status line,
/// headers (only `Content-Length` matters here), then the body.
pub async fn read_http_response<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<RawResponse, HypervisorError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    // Read until the blank line terminating the headers (\r\n\r\n).
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(HypervisorError::Unavailable("connection closed before headers completed".into()));
        }
        buf.push(byte[0]);
        if buf.len() >= 4 && &buf[buf.len() - 4..] == b"\r\n\r\n" {
            break;
        }
    }
    let header_text = String::from_utf8_lossy(&buf);
    let mut lines = header_text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status(status_line)?;

    let mut content_length: Option<usize> = None;
    let mut chunked = false;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            } else if name.eq_ignore_ascii_case("transfer-encoding") && value.trim().eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }

    let body = if chunked {
        read_chunked_body(reader).await?
    } else if let Some(len) = content_length {
        let mut body_buf = vec![0u8; len];
        reader.read_exact(&mut body_buf).await?;
        String::from_utf8_lossy(&body_buf).into_owned()
    } else {
        let mut rest = String::new();
        // Best-effort: daemon always sends Content-Length for our calls,
        // this branch only covers unexpected responses.
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => rest.push_str(&String::from_utf8_lossy(&chunk[..n])),
                Err(_) => break,
            }
        }
        rest
    };

    Ok(RawResponse { status, body })
}

async fn read_chunked_body<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<String, HypervisorError> {
    let mut out = Vec::new();
    loop {
        let mut size_line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = reader.read(&mut byte).await?;
            if n == 0 {
                return Err(HypervisorError::Unavailable("truncated chunked body".into()));
            }
            size_line.push(byte[0]);
            if size_line.len() >= 2 && &size_line[size_line.len() - 2..] == b"\r\n" {
                break;
            }
        }
        let size_text = String::from_utf8_lossy(&size_line);
        let size = usize::from_str_radix(size_text.trim(), 16)
            .map_err(|_| HypervisorError::Internal("malformed chunk size".into()))?;
        if size == 0 {
            break;
        }
        let mut chunk = vec![0u8; size];
        reader.read_exact(&mut chunk).await?;
        out.extend_from_slice(&chunk);
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn parse_status(status_line: &str) -> Result<u16, HypervisorError> {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HypervisorError::Internal(format!("malformed status line: {status_line:?}")))
}
