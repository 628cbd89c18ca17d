//! Pipeline module.
//!
//! This module provides the churn pipeline, its progress reporting and the
//! execution log collaborators.

mod builder;
pub mod log;
pub mod progress;
mod result;

pub use builder::{Pipeline, PipelineBuilder};
pub use log::{ExecutionRecorder, FileExecutionLog, MemoryRecorder, TracingRecorder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
pub use result::{PipelineResult, PreviewResult, RunSummary};
