//! Image Batch Service
//!
//! Ingests a product CSV, fetches and transforms every referenced image
//! (resize + recompress), persists the outputs through a Blob Sink, and
//! records durable job progress with a completion webhook.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
