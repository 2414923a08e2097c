//! Row Validator - schema and per-row checks for the source CSV
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::services::source::RowRecord;

/// Columns every source file must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["S. No.", "Product Name", "Input Image Urls"];

static IMAGE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://.+\.(jpg|jpeg|png)$").expect("valid URL regex"));

/// A structurally valid product row, ready for processing.
#[derive(Clone, Debug)]
pub struct ValidRow {
    pub index: u64,
    pub product_name: String,
    pub input_urls: Vec<String>,
}

/// Why one row was rejected. These are logged and the row skipped; they
/// never fail the job.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("row {row}: missing or empty column '{column}'")]
    MissingColumn { row: u64, column: String },

    #[error("row {row}: invalid image URL '{url}'")]
    InvalidUrl { row: u64, url: String },
}

/// Check the header row carries every required column. A mismatch fails
/// the whole job before any row work begins.
pub fn validate_headers(headers: &[String]) -> Result<()> {
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(AppError::Validation(format!(
                "Missing required column: {required}"
            )));
        }
    }
    Ok(())
}

/// Validate one data row: required columns present and non-empty, and
/// every comma-separated image URL well-formed.
pub fn validate_row(record: &RowRecord) -> std::result::Result<ValidRow, RowError> {
    for required in REQUIRED_COLUMNS {
        match record.fields.get(required) {
            Some(v) if !v.is_empty() => {}
            _ => {
                return Err(RowError::MissingColumn {
                    row: record.index,
                    column: required.to_string(),
                })
            }
        }
    }

    let product_name = record.fields["Product Name"].clone();
    let mut input_urls = Vec::new();
    for url in record.fields["Input Image Urls"].split(',') {
        let url = url.trim();
        if !IMAGE_URL_RE.is_match(url) {
            return Err(RowError::InvalidUrl {
                row: record.index,
                url: url.to_string(),
            });
        }
        input_urls.push(url.to_string());
    }

    Ok(ValidRow {
        index: record.index,
        product_name,
        input_urls,
    })
}
