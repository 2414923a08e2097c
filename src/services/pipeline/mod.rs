//! Batch processing pipeline
//!
//! Source Reader -> Row Validator -> Row Processor (-> Image Transform
//! Worker x N) -> Progress Tracker -> Job Store, driven by the job
//! runner and supervised as tracked tasks.
pub mod processor;
pub mod progress;
pub mod row;
pub mod runner;
pub mod supervisor;
pub mod transform;
pub mod validator;

pub use processor::ImageProcessor;
pub use row::RowProcessor;
pub use runner::JobRunner;
pub use supervisor::JobSupervisor;
pub use transform::TransformWorker;
