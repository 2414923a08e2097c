//! Job Store - durable persistence for jobs
pub mod job_store;

pub use job_store::{InMemoryJobStore, JobStore, PgJobStore};
