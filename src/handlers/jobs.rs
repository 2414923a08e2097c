//! Job handlers - HTTP endpoints for job submission and status polling
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::db::JobStore;
use crate::error::{AppError, Result};
use crate::models::{CreateJobRequest, CreateJobResponse, JobStatusResponse};
use crate::services::pipeline::JobSupervisor;

/// Create a job from an already-transported CSV file and start it.
pub async fn create_job(
    store: web::Data<Arc<dyn JobStore>>,
    supervisor: web::Data<Arc<JobSupervisor>>,
    req: web::Json<CreateJobRequest>,
) -> Result<HttpResponse> {
    if !req.source_path.to_lowercase().ends_with(".csv") {
        return Err(AppError::BadRequest(
            "Invalid file type. Only CSV files are allowed".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let job = store.create(id, &req.source_path).await?;
    supervisor.spawn(id).await?;

    Ok(HttpResponse::Created().json(CreateJobResponse {
        job_id: job.id,
        status: job.status,
    }))
}

/// Start (or re-attempt) a pending job explicitly. Jobs that are already
/// running or terminal are rejected with Conflict.
pub async fn run_job(
    store: web::Data<Arc<dyn JobStore>>,
    supervisor: web::Data<Arc<JobSupervisor>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = parse_job_id(&path)?;

    let job = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    if job.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Job {id} is already {}",
            job.status.as_str()
        )));
    }

    supervisor.spawn(id).await?;

    Ok(HttpResponse::Accepted().json(CreateJobResponse {
        job_id: job.id,
        status: job.status,
    }))
}

/// Query a job's status, progress, and results.
pub async fn get_job(
    store: web::Data<Arc<dyn JobStore>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = parse_job_id(&path)?;

    let job = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    Ok(HttpResponse::Ok().json(JobStatusResponse::from(job)))
}

fn parse_job_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid job ID".to_string()))
}
