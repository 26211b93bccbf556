//! Upload strategy registry.
//!
//! Strategies are declared in priority order — direct-to-storage first,
//! then the server-relay fallbacks — and filtered by availability at query
//! time. The registry does not orchestrate trying several strategies on
//! failure; that belongs to the caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use skiff_protocol::HTTP_DIRECT_TOOL;
use skiff_transfer::{ByteRange, SpeedCalculator, UploadFile, UploadTask};

use crate::api::{ApiClient, path_dir};
use crate::engine;
use crate::error::UploadError;
use crate::transport::{self, HttpTransport};

/// Server capability state consulted by availability predicates.
///
/// Passed in by the caller on every query; the registry holds no session
/// state of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCapabilities {
    /// Direct-upload tools the backend advertises for the current session.
    pub direct_upload_tools: Vec<String>,
}

impl ServerCapabilities {
    pub fn supports_tool(&self, tool: &str) -> bool {
        self.direct_upload_tools.iter().any(|t| t == tool)
    }
}

/// An upload method: a name, an availability predicate over current server
/// capabilities, and the transfer itself.
pub trait UploadStrategy: Send + Sync {
    /// Strategy name, stable for UI display.
    fn name(&self) -> &'static str;

    /// Whether this strategy is currently usable. Re-evaluated on every
    /// registry query; must stay a pure function of `caps`.
    fn is_available(&self, caps: &ServerCapabilities) -> bool;

    /// Moves `file` to the task's destination, updating the task's
    /// progress, speed, and terminal state as the transfer runs.
    fn upload<'a>(
        &'a self,
        file: &'a mut UploadFile,
        task: Arc<UploadTask>,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>>;
}

// ---------------------------------------------------------------------------
// Direct
// ---------------------------------------------------------------------------

/// Uploads straight to backing object storage using a backend-issued URL,
/// bypassing the server as a data relay.
pub struct DirectStrategy {
    api: Arc<ApiClient>,
    transport: HttpTransport,
}

impl DirectStrategy {
    /// The storage transport carries no default headers: storage endpoints
    /// get only what the descriptor specifies, never the server's auth.
    pub fn new(api: Arc<ApiClient>) -> Result<Self, UploadError> {
        Ok(Self {
            api,
            transport: HttpTransport::new()?,
        })
    }
}

impl UploadStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "HTTP Direct"
    }

    fn is_available(&self, caps: &ServerCapabilities) -> bool {
        caps.supports_tool(HTTP_DIRECT_TOOL)
    }

    fn upload<'a>(
        &'a self,
        file: &'a mut UploadFile,
        task: Arc<UploadTask>,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(async move {
            task.start();
            let dest = task.dest_path();
            let dir = path_dir(&dest);

            let info = match self
                .api
                .direct_upload_info(&dir, file.name(), file.size(), task.overwrite())
                .await
            {
                Ok(info) => info,
                Err(e) => {
                    task.fail(&e.to_string());
                    return Err(e);
                }
            };

            let Some(descriptor) = info else {
                debug!(dest = %dest, "destination does not support direct upload");
                let err = UploadError::DirectUnsupported;
                task.fail(&err.to_string());
                return Err(err);
            };

            engine::upload_with_descriptor(&self.transport, &descriptor, file, &task).await
        })
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// Streams the raw file body through the server's `/api/fs/put` endpoint.
/// Always available; this is the designed fallback floor.
pub struct StreamStrategy {
    api: Arc<ApiClient>,
    transport: HttpTransport,
}

impl StreamStrategy {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let transport = HttpTransport::from_client(api.http().clone());
        Self { api, transport }
    }
}

impl UploadStrategy for StreamStrategy {
    fn name(&self) -> &'static str {
        "Stream"
    }

    fn is_available(&self, _caps: &ServerCapabilities) -> bool {
        true
    }

    fn upload<'a>(
        &'a self,
        file: &'a mut UploadFile,
        task: Arc<UploadTask>,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(async move {
            task.start();
            let mut headers = match relay_headers(&task) {
                Ok(h) => h,
                Err(e) => {
                    task.fail(&e.to_string());
                    return Err(e);
                }
            };
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );

            debug!(file = file.name(), dest = %task.dest_path(), "stream upload");
            engine::send_whole(
                &self.transport,
                Method::PUT,
                &self.api.endpoint("/api/fs/put"),
                headers,
                file,
                &task,
            )
            .await
        })
    }
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Uploads through the server's `/api/fs/form` endpoint as a multipart
/// form. Always available.
pub struct FormStrategy {
    api: Arc<ApiClient>,
}

impl FormStrategy {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn send_form(
        &self,
        file: &mut UploadFile,
        task: &Arc<UploadTask>,
    ) -> Result<(), UploadError> {
        let headers = relay_headers(task)?;
        let total = file.size();
        let data = file.read_range(&ByteRange::full(total))?;

        let speed = Arc::new(SpeedCalculator::default());
        let on_progress = engine::task_progress(task, &speed, 0);
        let body = transport::progress_body(data, Arc::clone(&on_progress));

        let part = Part::stream_with_length(body, total)
            .file_name(file.name().to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        debug!(file = file.name(), dest = %task.dest_path(), "form upload");
        let response = self
            .api
            .http()
            .put(self.api.endpoint("/api/fs/form"))
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected(status.as_u16()));
        }
        on_progress(total, total);
        Ok(())
    }
}

impl UploadStrategy for FormStrategy {
    fn name(&self) -> &'static str {
        "Form"
    }

    fn is_available(&self, _caps: &ServerCapabilities) -> bool {
        true
    }

    fn upload<'a>(
        &'a self,
        file: &'a mut UploadFile,
        task: Arc<UploadTask>,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(async move {
            task.start();
            match self.send_form(file, &task).await {
                Ok(()) => {
                    task.complete();
                    Ok(())
                }
                Err(e) => {
                    task.fail(&e.to_string());
                    Err(e)
                }
            }
        })
    }
}

/// Headers common to both server-relay endpoints.
fn relay_headers(task: &UploadTask) -> Result<HeaderMap, UploadError> {
    let mut headers = HeaderMap::new();
    let encoded = utf8_percent_encode(&task.dest_path(), NON_ALPHANUMERIC).to_string();
    headers.insert(
        "File-Path",
        HeaderValue::from_str(&encoded)
            .map_err(|_| UploadError::InvalidHeader("file-path".into()))?,
    );
    headers.insert(
        "Overwrite",
        HeaderValue::from_static(if task.overwrite() { "true" } else { "false" }),
    );
    Ok(headers)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered set of upload strategies.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn UploadStrategy>>,
}

impl StrategyRegistry {
    /// Builds the standard strategy set in priority order: Direct, then
    /// Stream, then Form. Lower-overhead strategies come first so callers
    /// trying strategies in order prefer them.
    pub fn standard(api: Arc<ApiClient>) -> Result<Self, UploadError> {
        Ok(Self {
            strategies: vec![
                Arc::new(DirectStrategy::new(Arc::clone(&api))?),
                Arc::new(StreamStrategy::new(Arc::clone(&api))),
                Arc::new(FormStrategy::new(api)),
            ],
        })
    }

    /// Appends a custom strategy at the end of the priority order.
    pub fn register(&mut self, strategy: Arc<dyn UploadStrategy>) {
        self.strategies.push(strategy);
    }

    /// Returns the strategies whose availability predicate currently
    /// holds, preserving declaration order. Predicates are re-evaluated on
    /// every call, never cached.
    pub fn list_available(&self, caps: &ServerCapabilities) -> Vec<Arc<dyn UploadStrategy>> {
        self.strategies
            .iter()
            .filter(|s| s.is_available(caps))
            .cloned()
            .collect()
    }

    /// Names of the currently available strategies, in priority order.
    pub fn available_names(&self, caps: &ServerCapabilities) -> Vec<&'static str> {
        self.strategies
            .iter()
            .filter(|s| s.is_available(caps))
            .map(|s| s.name())
            .collect()
    }
}
