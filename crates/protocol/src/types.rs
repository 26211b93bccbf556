use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tool identifier the backend recognizes for HTTP direct uploads.
pub const HTTP_DIRECT_TOOL: &str = "HttpDirect";

/// HTTP method used for storage uploads when the backend omits one.
pub const DEFAULT_UPLOAD_METHOD: &str = "PUT";

/// Capability-negotiation request sent to the backend before a direct
/// upload. `path` is the destination directory, not the full file path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectUploadRequest {
    pub path: String,
    pub file_name: String,
    pub file_size: u64,
    pub tool: String,
}

impl DirectUploadRequest {
    /// Builds a negotiation request for the `HttpDirect` tool.
    pub fn http_direct(path: &str, file_name: &str, file_size: u64) -> Self {
        Self {
            path: path.to_string(),
            file_name: file_name.to_string(),
            file_size,
            tool: HTTP_DIRECT_TOOL.to_string(),
        }
    }
}

/// The backend's answer describing how a direct upload must be performed.
///
/// A JSON `null` response body (no descriptor) means direct upload is not
/// supported for the destination; callers deserialize into
/// `Option<UploadDescriptor>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    /// Maximum bytes per request. 0 means the storage endpoint takes the
    /// whole file in one request.
    #[serde(default)]
    pub chunk_size: u64,
    /// Short-lived storage URL the file bytes go to.
    pub upload_url: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra headers the storage endpoint requires on every request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    DEFAULT_UPLOAD_METHOD.to_string()
}

impl UploadDescriptor {
    /// Whether a file of `file_size` bytes must be split into ranged
    /// requests under this descriptor.
    pub fn wants_chunking(&self, file_size: u64) -> bool {
        self.chunk_size > 0 && file_size > self.chunk_size
    }
}

/// Current state of an upload task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl UploadStatus {
    /// A task is terminal once it has completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

/// Point-in-time snapshot of one upload task, as handed to progress
/// callbacks and UI layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub task_id: String,
    pub status: UploadStatus,
    pub file_name: String,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Percent complete, 0–100. Reaches exactly 100 only on completion.
    pub progress: f64,
    /// Advisory sliding-window throughput estimate.
    pub speed_bps: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}
