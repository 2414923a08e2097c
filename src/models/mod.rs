//! Data models
//!
//! This module defines structures for:
//! - Job: one batch processing run created from one source CSV
//! - RowResult: per-product outcome embedded in a Job
//! - API request/response types for the thin HTTP boundary
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

// ========================================
// Job Models
// ========================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(AppError::Internal(format!("Unknown job status: {other}"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Outcome of one processed product row.
///
/// `output_refs` has the same length and order as `input_urls`; a `None`
/// slot means the image at that position failed to transform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowResult {
    pub product_name: String,
    pub input_urls: Vec<String>,
    pub output_refs: Vec<Option<String>>,
}

/// One batch processing run.
///
/// Mutated only by its owning job runner; read-only once terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub source_file: String,
    pub status: JobStatus,
    /// Completion percentage, 0-100, non-decreasing while processing
    pub progress: i32,
    pub results: Vec<RowResult>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: Uuid, source_file: impl Into<String>) -> Self {
        Self {
            id,
            source_file: source_file.into(),
            status: JobStatus::Pending,
            progress: 0,
            results: Vec::new(),
            error: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Transition pending -> processing. Rejected for any other state so
    /// two runners can never own the same job.
    pub fn begin_processing(&mut self) -> Result<()> {
        if self.status != JobStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Job {} is {}, expected pending",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = JobStatus::Processing;
        Ok(())
    }

    /// Transition processing -> completed, freezing the job.
    pub fn complete(&mut self, results: Vec<RowResult>) -> Result<()> {
        self.ensure_not_terminal()?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.results = results;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Transition processing -> failed. Results accumulated before the
    /// fatal point are preserved, not rolled back.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.ensure_not_terminal()?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    fn ensure_not_terminal(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Job {} already terminal ({})",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

// ========================================
// API Models
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    /// Path to an already-transported CSV file on local disk
    pub source_path: String,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: i32,
    pub results: Vec<RowResult>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            results: job.results,
            error: job.error,
            completed_at: job.completed_at,
        }
    }
}
