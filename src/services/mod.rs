//! Service layer
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod webhook;
