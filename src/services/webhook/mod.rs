//! Notifier - completion webhook delivery
//!
//! Best-effort, at most one attempt. Failures are logged and swallowed;
//! a webhook failure never changes a job's own status. An unset target
//! URL disables notification entirely.
use std::time::Duration;

use tracing::{info, warn};

use crate::models::Job;

pub struct Notifier {
    http: reqwest::Client,
    target: Option<String>,
}

impl Notifier {
    pub fn new(target: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            target,
        }
    }

    /// POST the job's terminal state to the configured webhook.
    pub async fn notify(&self, job: &Job) {
        let Some(url) = &self.target else {
            return;
        };

        let payload = serde_json::json!({
            "job_id": job.id,
            "status": job.status,
            "results": job.results,
        });

        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(job_id = %job.id, "Webhook delivered");
            }
            Ok(response) => {
                warn!(
                    job_id = %job.id,
                    status = %response.status(),
                    "Webhook target returned error status"
                );
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Webhook delivery failed");
            }
        }
    }
}
