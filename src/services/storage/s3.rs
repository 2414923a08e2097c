//! S3 Blob Sink
//!
//! Persists transformed images to an S3 bucket. The returned reference
//! is a public URL when a base URL is configured, otherwise the
//! `s3://bucket/key` form.
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::BlobSink;
use crate::error::{AppError, Result};

pub struct S3BlobSink {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl S3BlobSink {
    /// Build a sink from ambient AWS credentials.
    pub async fn from_env(bucket: &str, region: &str, public_base_url: Option<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            bucket: bucket.to_string(),
            public_base_url,
        }
    }
}

#[async_trait]
impl BlobSink for S3BlobSink {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("S3 upload failed for {key}: {e}")))?;

        debug!(key = %key, size = size, bucket = %self.bucket, "Blob uploaded to S3");

        let reference = match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("s3://{}/{}", self.bucket, key),
        };
        Ok(reference)
    }
}
