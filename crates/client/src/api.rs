//! Server API client and direct-upload capability negotiation.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use skiff_protocol::{DirectUploadRequest, UploadDescriptor};

use crate::error::UploadError;

/// Client for the file server's own HTTP API.
///
/// Carries an optional bearer token on every request; credential
/// acquisition is the caller's concern.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>, token: Option<&str>) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| UploadError::InvalidHeader("authorization token".into()))?,
            );
        }

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// The underlying HTTP client, with default headers applied.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for a server API path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Asks the backend whether `dir` supports direct-to-storage upload
    /// for the given file.
    ///
    /// Returns `Ok(None)` when the backend answers `null`: direct upload
    /// is definitively unsupported for this destination and the caller
    /// must choose another strategy. A non-2xx response or network failure
    /// fails the resolution itself; there is no retry and no implicit
    /// fallback.
    pub async fn direct_upload_info(
        &self,
        dir: &str,
        file_name: &str,
        file_size: u64,
        overwrite: bool,
    ) -> Result<Option<UploadDescriptor>, UploadError> {
        let request = DirectUploadRequest::http_direct(dir, file_name, file_size);
        let response = self
            .http
            .post(self.endpoint("/api/fs/get_direct_upload_info"))
            .header("Overwrite", if overwrite { "true" } else { "false" })
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected(status.as_u16()));
        }

        let info: Option<UploadDescriptor> = response.json().await?;
        debug!(
            dir,
            file_name,
            supported = info.is_some(),
            "direct upload negotiation"
        );
        Ok(info)
    }
}

/// Returns the parent directory of a destination path (`/` for top-level
/// entries).
pub fn path_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
    }
}
