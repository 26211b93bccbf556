//! Upload strategies and HTTP transfer engines.
//!
//! This crate implements the network side of skiff: moving one local file
//! to a remote destination, either **directly** to backing object storage
//! (capability negotiated with the backend) or **relayed** through the
//! server's own upload endpoints.
//!
//! # Pipeline
//!
//! 1. **Select** — pick a strategy from [`StrategyRegistry::list_available`]
//! 2. **Resolve** — the Direct strategy asks the backend for an upload
//!    descriptor; `null` means unsupported, pick the next strategy
//! 3. **Transfer** — the descriptor routes to the single-shot or chunked
//!    engine; relay strategies stream to the server instead
//! 4. **Observe** — the task's progress/speed update per transport tick
//!
//! Exactly one request is in flight per task at any time, and no request
//! is retried; failures propagate to the caller as a failed outcome.

pub mod api;
pub mod engine;
pub mod error;
pub mod strategy;
pub mod transport;

#[cfg(test)]
pub(crate) mod testsupport;

// Re-export primary types for convenience.
pub use api::{ApiClient, path_dir};
pub use error::UploadError;
pub use strategy::{
    DirectStrategy, FormStrategy, ServerCapabilities, StrategyRegistry, StreamStrategy,
    UploadStrategy,
};
pub use transport::HttpTransport;
