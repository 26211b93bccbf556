//! Wire types for skiff upload negotiation and progress reporting.
//!
//! Field names follow the backend API verbatim (`snake_case` JSON), so
//! these structs serialize straight onto the wire. No I/O lives here.

pub mod types;

pub use types::{
    DEFAULT_UPLOAD_METHOD, DirectUploadRequest, HTTP_DIRECT_TOOL, UploadDescriptor,
    UploadProgress, UploadStatus,
};
