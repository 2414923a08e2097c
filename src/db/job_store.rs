//! Job Store implementations
//!
//! The pipeline persists jobs through the `JobStore` trait so the core
//! never depends on a concrete backend. `PgJobStore` is the production
//! implementation; `InMemoryJobStore` backs tests and local development.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Job, JobStatus, RowResult};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a new pending job. Rejects a duplicate id with Conflict so
    /// two runners can never be started against the same job.
    async fn create(&self, id: Uuid, source_file: &str) -> Result<Job>;

    /// Look up a job by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>>;

    /// Persist the current state of a job.
    async fn save(&self, job: &Job) -> Result<()>;
}

// ========================================
// Postgres implementation
// ========================================

/// Postgres-backed Job Store.
///
/// Expected schema:
/// ```sql
/// CREATE TABLE jobs (
///     id           UUID PRIMARY KEY,
///     source_file  TEXT NOT NULL,
///     status       TEXT NOT NULL,
///     progress     INT NOT NULL DEFAULT 0,
///     results      JSONB NOT NULL DEFAULT '[]',
///     error        TEXT,
///     completed_at TIMESTAMPTZ,
///     created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<Job> {
        let status: String = row.try_get("status")?;
        let results: serde_json::Value = row.try_get("results")?;
        let results: Vec<RowResult> = serde_json::from_value(results)?;

        Ok(Job {
            id: row.try_get("id")?,
            source_file: row.try_get("source_file")?,
            status: JobStatus::parse(&status)?,
            progress: row.try_get("progress")?,
            results,
            error: row.try_get("error")?,
            completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, id: Uuid, source_file: &str) -> Result<Job> {
        let job = Job::new(id, source_file);

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, source_file, status, progress, results, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(job.id)
        .bind(&job.source_file)
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(serde_json::to_value(&job.results)?)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("Job {id} already exists")));
        }

        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            SELECT id, source_file, status, progress, results, error, completed_at, created_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::job_from_row(&r)).transpose()
    }

    async fn save(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2, progress = $3, results = $4, error = $5, completed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(serde_json::to_value(&job.results)?)
        .bind(&job.error)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ========================================
// In-memory implementation
// ========================================

/// In-memory Job Store for tests and local development.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: Uuid, source_file: &str) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(AppError::Conflict(format!("Job {id} already exists")));
        }
        let job = Job::new(id, source_file);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn save(&self, job: &Job) -> Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_create_and_find() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        store.create(id, "products.csv").await.unwrap();

        let job = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.source_file, "products.csv");
    }

    #[tokio::test]
    async fn test_in_memory_duplicate_create_rejected() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        store.create(id, "a.csv").await.unwrap();
        assert!(matches!(
            store.create(id, "b.csv").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_save_round_trip() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        let mut job = store.create(id, "a.csv").await.unwrap();
        job.begin_processing().unwrap();
        job.progress = 40;
        store.save(&job).await.unwrap();

        let loaded = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.progress, 40);
    }
}
