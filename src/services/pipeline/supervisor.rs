//! Job supervisor - tracked handles for running jobs
//!
//! Job submission is fire-and-forget from the boundary's perspective,
//! but every run is held as a tracked task handle so shutdown can signal
//! cancellation and no two runs of the same job id can overlap.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::runner::JobRunner;
use crate::error::{AppError, Result};

pub struct JobSupervisor {
    runner: Arc<JobRunner>,
    running: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    cancel_tx: watch::Sender<bool>,
}

impl JobSupervisor {
    pub fn new(runner: Arc<JobRunner>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            runner,
            running: Mutex::new(HashMap::new()),
            cancel_tx,
        }
    }

    /// Start a job in the background. Rejects a job id that is still
    /// running with Conflict.
    pub async fn spawn(&self, id: Uuid) -> Result<()> {
        let mut running = self.running.lock().await;
        running.retain(|_, handle| !handle.is_finished());

        if running.contains_key(&id) {
            return Err(AppError::Conflict(format!("Job {id} is already running")));
        }

        let runner = self.runner.clone();
        let cancel = self.cancel_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = runner.run(id, cancel).await {
                error!(job_id = %id, error = %e, "Job run ended with error");
            }
        });
        running.insert(id, handle);

        Ok(())
    }

    /// Number of jobs currently tracked as running.
    pub async fn running_count(&self) -> usize {
        let mut running = self.running.lock().await;
        running.retain(|_, handle| !handle.is_finished());
        running.len()
    }

    /// Signal cancellation to all runners and wait for them to stop.
    /// In-flight jobs stop scheduling new work and stay non-terminal.
    pub async fn shutdown(&self) {
        let _ = self.cancel_tx.send(true);

        let handles: Vec<(Uuid, JoinHandle<()>)> =
            self.running.lock().await.drain().collect();
        for (id, handle) in handles {
            if let Err(e) = handle.await {
                error!(job_id = %id, error = %e, "Job task join failed during shutdown");
            }
        }

        info!("Job supervisor shut down");
    }
}
