//! HTTP transport adapter: one request, streamed body, byte-level progress.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::stream;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Body, Method, StatusCode};

use crate::error::UploadError;

/// Size of the frames a request body is streamed in. Each frame pulled
/// onto the wire produces one progress tick.
const FRAME_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_sent, bytes_total)` for the current request.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Thin wrapper around `reqwest::Client` that reports upload progress.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh HTTP client carrying no default
    /// headers. Storage endpoints get only what the descriptor specifies.
    pub fn new() -> Result<Self, UploadError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
        })
    }

    /// Wraps an existing client (keeps its default headers, e.g. auth).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Sends `body` to `url` in one request, ticking `on_progress` as
    /// frames go out.
    ///
    /// The final tick before a successful return always reports
    /// `bytes_sent == bytes_total`, including for empty bodies. A status
    /// outside `[200, 300)` is [`UploadError::Rejected`]; a network
    /// failure is [`UploadError::Http`]. No retries are made.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
        on_progress: ProgressFn,
    ) -> Result<StatusCode, UploadError> {
        let total = body.len() as u64;
        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .header(CONTENT_LENGTH, total)
            .body(progress_body(body, Arc::clone(&on_progress)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected(status.as_u16()));
        }
        on_progress(total, total);
        Ok(status)
    }
}

/// Wraps `data` in a frame stream that ticks `on_progress` with the
/// cumulative byte count as each frame is handed to the connection.
pub(crate) fn progress_body(data: Bytes, on_progress: ProgressFn) -> Body {
    if data.is_empty() {
        return Body::from(Vec::new());
    }

    let total = data.len() as u64;
    let mut frames = Vec::with_capacity(data.len().div_ceil(FRAME_SIZE));
    let mut start = 0;
    while start < data.len() {
        let end = (start + FRAME_SIZE).min(data.len());
        frames.push(data.slice(start..end));
        start = end;
    }

    let sent = AtomicU64::new(0);
    Body::wrap_stream(stream::iter(frames.into_iter().map(move |frame| {
        let cumulative = sent.fetch_add(frame.len() as u64, Ordering::Relaxed) + frame.len() as u64;
        on_progress(cumulative, total);
        Ok::<Bytes, Infallible>(frame)
    })))
}
