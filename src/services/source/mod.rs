//! Source Reader - CSV row access for the pipeline
//!
//! Reads the job's source file into row mappings (column name -> value).
//! The whole file is buffered in one pass, so the total row count is
//! known before the first progress computation. Parsing is offloaded to
//! the blocking pool since the csv reader is synchronous.
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// One raw data row: its 1-based position in the file plus the column
/// name -> value mapping.
#[derive(Clone, Debug)]
pub struct RowRecord {
    pub index: u64,
    pub fields: HashMap<String, String>,
}

/// Buffered contents of one source CSV.
#[derive(Clone, Debug)]
pub struct SourceData {
    pub headers: Vec<String>,
    pub rows: Vec<RowRecord>,
}

pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read headers and all data rows. Any I/O or parse error here is
    /// fatal to the job (the source is unreadable).
    pub async fn load(&self) -> Result<SourceData> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || read_csv(&path))
            .await
            .map_err(|e| AppError::Internal(format!("CSV reader task panicked: {e}")))?
    }
}

fn read_csv(path: &std::path::Path) -> Result<SourceData> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::Infrastructure(format!("Cannot open source file {}: {e}", path.display()))
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Infrastructure(format!("Cannot read CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let fields = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| v.trim().to_string()))
            .collect();
        rows.push(RowRecord {
            index: (i + 1) as u64,
            fields,
        });
    }

    Ok(SourceData { headers, rows })
}
