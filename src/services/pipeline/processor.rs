//! Image processor - resize and recompress fetched product images
//!
//! Decodes an image, resizes it to fit inside the configured maximum
//! dimension while preserving aspect ratio (never upscaling), and
//! re-encodes it as JPEG at the configured quality.
//!
//! Uses `spawn_blocking` for the CPU-intensive work to avoid blocking
//! the async runtime.
use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::debug;

use crate::error::TransformError;

pub struct ImageProcessor {
    max_dimension: u32,
    jpeg_quality: u8,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32, jpeg_quality: u8) -> Self {
        Self {
            max_dimension,
            jpeg_quality,
        }
    }

    /// Transform raw image bytes (blocking version).
    ///
    /// **Note:** CPU-intensive; call `process_async` from async code.
    pub fn process(&self, original: &[u8]) -> Result<Bytes, TransformError> {
        let img = image::load_from_memory(original)
            .map_err(|e| TransformError::Decode(format!("not a decodable image: {e}")))?;

        let (orig_w, orig_h) = img.dimensions();

        // Fit-inside semantics: images already within bounds are only
        // recompressed, never upscaled.
        let output = if orig_w <= self.max_dimension && orig_h <= self.max_dimension {
            self.encode_jpeg(&img)?
        } else {
            let resized = img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
            let (w, h) = resized.dimensions();
            debug!(
                original_width = orig_w,
                original_height = orig_h,
                width = w,
                height = h,
                "Image resized"
            );
            self.encode_jpeg(&resized)?
        };

        Ok(output)
    }

    /// Transform raw image bytes on the blocking thread pool.
    pub async fn process_async(self: Arc<Self>, original: Bytes) -> Result<Bytes, TransformError> {
        let processor = self.clone();

        tokio::task::spawn_blocking(move || processor.process(&original))
            .await
            .map_err(|e| TransformError::Internal(format!("image task panicked: {e}")))?
    }

    fn encode_jpeg(&self, img: &DynamicImage) -> Result<Bytes, TransformError> {
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);

        img.write_to(&mut cursor, ImageOutputFormat::Jpeg(self.jpeg_quality))
            .map_err(|e| TransformError::Internal(format!("JPEG encode failed: {e}")))?;

        Ok(Bytes::from(buf))
    }
}
