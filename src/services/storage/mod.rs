//! Blob Sink - persistence for transformed image bytes
//!
//! The pipeline hands encoded bytes to a `BlobSink` and gets back an
//! opaque, externally retrievable reference. Filesystem and S3 backends
//! are provided; selection happens in `main` from configuration.
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub mod fs;
pub mod s3;

pub use fs::FsBlobSink;
pub use s3::S3BlobSink;

#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Persist `data` under `key` and return a retrievable reference
    /// (path or URL).
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;
}
