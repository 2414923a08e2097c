//! Job runner - the lifecycle state machine for one batch job
//!
//! Owns the job record for the duration of a run: pending -> processing
//! -> completed | failed. Per-URL failures surface only as `None` output
//! slots and structurally invalid rows are skipped; only
//! infrastructure-class errors (source unreadable, schema mismatch, Job
//! Store unreachable) flip the job to `failed`.
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::progress;
use super::row::RowProcessor;
use super::validator;
use crate::db::JobStore;
use crate::error::{AppError, Result};
use crate::models::Job;
use crate::services::source::CsvSource;
use crate::services::webhook::Notifier;

enum Outcome {
    Finished,
    Cancelled,
}

pub struct JobRunner {
    store: Arc<dyn JobStore>,
    rows: RowProcessor,
    notifier: Arc<Notifier>,
    progress_batch_size: u64,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        rows: RowProcessor,
        notifier: Arc<Notifier>,
        progress_batch_size: u64,
    ) -> Self {
        Self {
            store,
            rows,
            notifier,
            progress_batch_size,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// Re-invoking on an already-terminal or already-running job returns
    /// Conflict. A cancellation signal stops scheduling new rows and
    /// leaves the job in `processing` with its last persisted progress.
    pub async fn run(&self, id: Uuid, mut cancel: watch::Receiver<bool>) -> Result<()> {
        let mut job = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

        // Persist the processing transition before any row work, so a
        // concurrent status query never observes `pending` once work has
        // begun.
        job.begin_processing()?;
        self.store.save(&job).await?;

        info!(job_id = %id, source = %job.source_file, "Job processing started");

        match self.process_rows(&mut job, &mut cancel).await {
            Ok(Outcome::Finished) => {
                // Complete a copy so the pre-terminal job is still at
                // hand if the terminal save cannot be persisted.
                let mut completed = job.clone();
                let results = std::mem::take(&mut completed.results);
                completed.complete(results)?;

                match self.store.save(&completed).await {
                    Ok(()) => {
                        info!(job_id = %id, rows = completed.results.len(), "Job completed");
                        self.notifier.notify(&completed).await;
                        Ok(())
                    }
                    Err(e) => {
                        // The completed state never reached the store;
                        // resolve the outage like any other fatal store
                        // error instead of leaving `processing` behind.
                        error!(job_id = %id, error = %e, "Failed to persist completed job");
                        Err(self.fail_and_notify(job, e).await)
                    }
                }
            }
            Ok(Outcome::Cancelled) => {
                info!(job_id = %id, "Job cancelled before completion");
                Ok(())
            }
            Err(e) => Err(self.fail_and_notify(job, e).await),
        }
    }

    /// Flip a non-terminal job to `failed`, persist it best-effort, and
    /// notify subscribers. Returns the originating error.
    async fn fail_and_notify(&self, mut job: Job, error: AppError) -> AppError {
        error!(job_id = %job.id, error = %error, "Job failed");

        // Results accumulated before the fatal point are preserved, not
        // rolled back.
        if job.fail(error.to_string()).is_ok() {
            if let Err(save_err) = self.store.save(&job).await {
                error!(job_id = %job.id, error = %save_err, "Failed to persist failed job");
            }
        }

        self.notifier.notify(&job).await;
        error
    }

    async fn process_rows(
        &self,
        job: &mut Job,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Outcome> {
        let data = CsvSource::new(&job.source_file).load().await?;

        // A header mismatch fails the whole job before any row work.
        validator::validate_headers(&data.headers)?;

        let total = data.rows.len() as u64;
        let mut processed = 0u64;

        for record in &data.rows {
            if *cancel.borrow() {
                return Ok(Outcome::Cancelled);
            }

            match validator::validate_row(record) {
                Ok(valid) => match self.rows.process(&valid, cancel).await {
                    Some(result) => job.results.push(result),
                    // Interrupted mid-row: no partial row is recorded.
                    None => return Ok(Outcome::Cancelled),
                },
                Err(e) => {
                    // Skipped, not fatal: a bad row never fails the job.
                    warn!(job_id = %job.id, error = %e, "Skipping invalid row");
                }
            }

            processed += 1;
            let (should_persist, pct) =
                progress::on_row_processed(processed, total, self.progress_batch_size);
            if should_persist {
                job.progress = pct;
                self.store.save(job).await?;
                debug!(job_id = %job.id, progress = pct, "Progress persisted");
            }
        }

        Ok(Outcome::Finished)
    }
}
