//! Filesystem Blob Sink
//!
//! Writes transformed images under a local output directory. The
//! returned reference is either a public URL (when a base URL is
//! configured) or the file path itself.
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::BlobSink;
use crate::error::{AppError, Result};

pub struct FsBlobSink {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsBlobSink {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }
}

#[async_trait]
impl BlobSink for FsBlobSink {
    async fn store(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String> {
        let path = self.root.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Cannot create output dir: {e}")))?;
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write {}: {e}", path.display())))?;

        debug!(key = %key, size = data.len(), "Blob written to filesystem");

        let reference = match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => path.display().to_string(),
        };
        Ok(reference)
    }
}
