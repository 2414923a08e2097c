//! HTTP handlers - thin boundary over the pipeline
mod jobs;

pub use jobs::{create_job, get_job, run_job};
