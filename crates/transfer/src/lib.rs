//! Chunk planning, upload task state, and progress tracking.
//!
//! The transfer core is network-free: it plans byte ranges, reads file
//! sources, and tracks per-task progress and speed. The HTTP engines that
//! drive it live in `skiff-client`.

mod plan;
mod progress;
mod source;
mod task;

pub use plan::{ByteRange, chunk_count, plan_chunks};
pub use progress::{ProgressCallback, ProgressTracker, SpeedCalculator};
pub use source::UploadFile;
pub use task::UploadTask;

/// Errors produced by the transfer core.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("range {start}..{end} out of bounds for {size}-byte source")]
    RangeOutOfBounds { start: u64, end: u64, size: u64 },
}
