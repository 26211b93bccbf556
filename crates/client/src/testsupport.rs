//! Shared HTTP test doubles: scripted single-connection-per-request servers.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One captured HTTP request: start line, headers, body.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the raw body contains `needle` (multipart bodies carry
    /// framing around the payload).
    pub fn body_contains(&self, needle: &[u8]) -> bool {
        find_subslice(&self.body, needle).is_some()
    }
}

pub type RequestLog = Arc<Mutex<Vec<CapturedRequest>>>;

/// Starts a mock server that answers the i-th request with the i-th
/// scripted `(status, body)` pair and records every request.
///
/// Each response carries `Connection: close`, so a client issuing
/// sequential requests produces sequential accepts; the server exits after
/// the script runs out.
pub async fn scripted_server(responses: Vec<(u16, String)>) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}");
    let captured: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&captured);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let request = read_request(&mut stream).await;
            log.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len(),
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (url, captured)
}

/// Shorthand for a server that always responds with empty bodies.
pub async fn status_server(statuses: Vec<u16>) -> (String, RequestLog) {
    scripted_server(statuses.into_iter().map(|s| (s, String::new())).collect()).await
}

async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut tmp).await.unwrap_or(0);
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if n == 0 {
            break buf.len();
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let start_line = lines.next().unwrap_or_default();
    let mut parts = start_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    let chunked = headers.iter().any(|(n, v)| {
        n.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked")
    });

    let mut body = buf[header_end..].to_vec();
    if chunked {
        // Raw chunked framing is kept; read until the terminal chunk.
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut tmp).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
    } else {
        while body.len() < content_length {
            let n = stream.read(&mut tmp).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
    }

    CapturedRequest {
        method,
        target,
        headers,
        body,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
