//! Configuration management
//!
//! Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub webhook: WebhookConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Blob Sink selection: local filesystem by default, S3 when a bucket
/// is configured.
#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub output_dir: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub public_base_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Max width/height of transformed images, in pixels
    pub max_dimension: u32,
    /// JPEG quality for re-encoding (0-100)
    pub jpeg_quality: u8,
    /// Per-image download timeout, in seconds
    pub fetch_timeout_secs: u64,
    /// Concurrent image downloads within one row
    pub url_concurrency: usize,
    /// Persist progress every N processed rows
    pub progress_batch_size: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookConfig {
    /// Completion webhook target; absence disables notification
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/image_batch".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            storage: StorageConfig {
                output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "uploads".to_string()),
                s3_bucket: std::env::var("S3_BUCKET").ok(),
                s3_region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                public_base_url: std::env::var("PUBLIC_BASE_URL").ok(),
            },
            pipeline: PipelineConfig {
                max_dimension: std::env::var("PIPELINE_MAX_DIMENSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(800),
                jpeg_quality: std::env::var("PIPELINE_JPEG_QUALITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
                fetch_timeout_secs: std::env::var("PIPELINE_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
                url_concurrency: std::env::var("PIPELINE_URL_CONCURRENCY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(4),
                progress_batch_size: std::env::var("PIPELINE_PROGRESS_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            },
            webhook: WebhookConfig {
                url: std::env::var("WEBHOOK_URL").ok(),
                timeout_secs: std::env::var("WEBHOOK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            },
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            jpeg_quality: 50,
            fetch_timeout_secs: 30,
            url_concurrency: 4,
            progress_batch_size: 5,
        }
    }
}
