//! Image Transform Worker - fetch, transform, and persist one image
//!
//! Every call is isolated: a failure at any step yields a
//! `TransformError` for that URL only and never aborts sibling work.
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use super::processor::ImageProcessor;
use crate::error::{Result, TransformError};
use crate::services::storage::BlobSink;

pub struct TransformWorker {
    http: reqwest::Client,
    processor: Arc<ImageProcessor>,
    sink: Arc<dyn BlobSink>,
}

impl TransformWorker {
    pub fn new(
        processor: Arc<ImageProcessor>,
        sink: Arc<dyn BlobSink>,
        fetch_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| crate::error::AppError::Internal(format!("HTTP client error: {e}")))?;

        Ok(Self {
            http,
            processor,
            sink,
        })
    }

    /// Fetch one image, resize and recompress it, persist the output,
    /// and return the stored reference.
    pub async fn transform(&self, url: &str) -> std::result::Result<String, TransformError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransformError::Fetch(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| TransformError::Fetch(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TransformError::Fetch(e.to_string()))?;

        debug!(url = %url, size = body.len(), "Image downloaded");

        let encoded = self.processor.clone().process_async(body).await?;

        let key = output_key(url);
        self.sink
            .store(&key, encoded, "image/jpeg")
            .await
            .map_err(|e| TransformError::Store(e.to_string()))
    }
}

/// Derive a unique output key from the source URL's file name.
fn output_key(url: &str) -> String {
    let stem = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(|s| s.to_string()))
        })
        .filter(|s| !s.is_empty())
        .map(|name| match name.rsplit_once('.') {
            Some((stem, _ext)) => stem.to_string(),
            None => name,
        })
        .unwrap_or_else(|| "image".to_string());

    format!("processed_{}_{stem}.jpg", Uuid::new_v4())
}
