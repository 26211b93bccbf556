//! Single-shot and chunked upload engines.
//!
//! Both engines drive the [`HttpTransport`] with state from an
//! [`UploadTask`], publishing cumulative progress and a sliding-window
//! speed estimate per transport tick. Exactly one request is in flight at
//! any time; a failed request fails the whole task with no retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Method;
use reqwest::header::{CONTENT_RANGE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use skiff_protocol::UploadDescriptor;
use skiff_transfer::{ByteRange, SpeedCalculator, UploadFile, UploadTask, plan_chunks};

use crate::error::UploadError;
use crate::transport::{HttpTransport, ProgressFn};

/// Uploads `file` per `descriptor`, routing to the chunked engine when the
/// descriptor advertises a chunk size smaller than the file.
pub async fn upload_with_descriptor(
    transport: &HttpTransport,
    descriptor: &UploadDescriptor,
    file: &mut UploadFile,
    task: &Arc<UploadTask>,
) -> Result<(), UploadError> {
    if descriptor.wants_chunking(file.size()) {
        upload_chunked(transport, descriptor, file, task).await
    } else {
        upload_single(transport, descriptor, file, task).await
    }
}

/// Transfers the whole file body in one request. No `Content-Range` is
/// sent; an empty file still issues exactly one (empty-body) request.
pub async fn upload_single(
    transport: &HttpTransport,
    descriptor: &UploadDescriptor,
    file: &mut UploadFile,
    task: &Arc<UploadTask>,
) -> Result<(), UploadError> {
    let (method, headers) = match descriptor_parts(descriptor) {
        Ok(parts) => parts,
        Err(e) => {
            task.fail(&e.to_string());
            return Err(e);
        }
    };

    debug!(
        file = file.name(),
        bytes = file.size(),
        url = descriptor.upload_url.as_str(),
        "single-shot upload"
    );
    send_whole(transport, method, &descriptor.upload_url, headers, file, task).await
}

/// Uploads the file as strictly sequential ranged requests.
///
/// Chunk *N+1* is not issued until chunk *N* received a success response;
/// the storage side tracks its write offset under that ordering. Any chunk
/// failure aborts the sequence immediately — earlier chunks are not rolled
/// back and nothing is retried.
pub async fn upload_chunked(
    transport: &HttpTransport,
    descriptor: &UploadDescriptor,
    file: &mut UploadFile,
    task: &Arc<UploadTask>,
) -> Result<(), UploadError> {
    task.start();
    match chunk_sequence(transport, descriptor, file, task).await {
        Ok(()) => {
            task.complete();
            Ok(())
        }
        Err(e) => {
            task.fail(&e.to_string());
            Err(e)
        }
    }
}

async fn chunk_sequence(
    transport: &HttpTransport,
    descriptor: &UploadDescriptor,
    file: &mut UploadFile,
    task: &Arc<UploadTask>,
) -> Result<(), UploadError> {
    let (method, base_headers) = descriptor_parts(descriptor)?;
    let plan = plan_chunks(file.size(), descriptor.chunk_size);
    let total = plan.len();
    let speed = Arc::new(SpeedCalculator::default());

    debug!(
        file = file.name(),
        chunks = total,
        chunk_size = descriptor.chunk_size,
        "chunked upload"
    );

    let mut completed: u64 = 0;
    for (i, range) in plan.iter().enumerate() {
        let body = file.read_range(range)?;
        let mut headers = base_headers.clone();
        let value = HeaderValue::from_str(&range.content_range(file.size()))
            .map_err(|_| UploadError::InvalidHeader("content-range".into()))?;
        headers.insert(CONTENT_RANGE, value);

        let on_progress = task_progress(task, &speed, completed);
        transport
            .send(
                method.clone(),
                &descriptor.upload_url,
                headers,
                body,
                on_progress,
            )
            .await
            .map_err(|e| UploadError::ChunkAborted {
                index: i + 1,
                total,
                reason: e.to_string(),
            })?;

        completed += range.len();
        task.set_transferred(completed);
    }
    Ok(())
}

/// Sends the complete file body in one request and settles the task's
/// terminal state. Shared by the single-shot engine and the server-relay
/// strategies.
pub(crate) async fn send_whole(
    transport: &HttpTransport,
    method: Method,
    url: &str,
    headers: HeaderMap,
    file: &mut UploadFile,
    task: &Arc<UploadTask>,
) -> Result<(), UploadError> {
    task.start();
    let result = async {
        let body = file.read_range(&ByteRange::full(file.size()))?;
        let speed = Arc::new(SpeedCalculator::default());
        let on_progress = task_progress(task, &speed, 0);
        transport.send(method, url, headers, body, on_progress).await
    }
    .await;

    match result {
        Ok(_status) => {
            task.complete();
            Ok(())
        }
        Err(e) => {
            task.fail(&e.to_string());
            Err(e)
        }
    }
}

/// Builds a transport progress callback that publishes cumulative task
/// progress (offset by `base` bytes from earlier chunks) and the speed
/// estimate.
pub(crate) fn task_progress(
    task: &Arc<UploadTask>,
    speed: &Arc<SpeedCalculator>,
    base: u64,
) -> ProgressFn {
    let task = Arc::clone(task);
    let speed = Arc::clone(speed);
    let last = AtomicU64::new(0);
    Arc::new(move |sent, _total| {
        let prev = last.swap(sent, Ordering::Relaxed);
        if sent > prev {
            speed.add_sample(sent - prev);
        }
        task.set_transferred(base + sent);
        task.set_speed(speed.bytes_per_second());
    })
}

fn descriptor_parts(descriptor: &UploadDescriptor) -> Result<(Method, HeaderMap), UploadError> {
    let method = Method::from_bytes(descriptor.method.as_bytes())
        .map_err(|_| UploadError::Descriptor(format!("method {:?}", descriptor.method)))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &descriptor.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| UploadError::Descriptor(format!("header name {name:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| UploadError::Descriptor(format!("value for header {name}")))?;
        headers.insert(name, value);
    }
    Ok((method, headers))
}
