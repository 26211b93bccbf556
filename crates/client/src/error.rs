//! Upload error types.

/// Errors produced while resolving or executing an upload.
///
/// None of these are retried internally; each propagates to the caller of
/// the strategy's `upload` as a failed outcome.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Network-level failure: no usable response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response arrived with a status outside `[200, 300)`.
    #[error("upload rejected with status {0}")]
    Rejected(u16),

    /// Capability negotiation answered `null`: the destination does not
    /// support direct upload. Callers pick the next available strategy.
    #[error("direct upload not supported for this destination")]
    DirectUnsupported,

    /// A chunk failed mid-sequence; no later chunk was issued and the
    /// already-uploaded chunks are not rolled back. `index` is 1-based.
    #[error("chunk {index} of {total} failed: {reason}")]
    ChunkAborted {
        index: usize,
        total: usize,
        reason: String,
    },

    /// The backend's upload descriptor contains an unusable method or
    /// header.
    #[error("invalid upload descriptor: {0}")]
    Descriptor(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] skiff_transfer::TransferError),
}
