//! Progress reporting for the churn pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use churn_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(records)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the churn pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Validating configuration and input
    Initializing,
    /// Profiling the raw dataset
    Inspection,
    /// Deduplication, negative filtering and quality checks
    Cleaning,
    /// Exploratory churn analysis
    Exploration,
    /// Dashboard KPIs and segment tables
    DashboardMetrics,
    /// Persisting reports and datasets
    ReportWriting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Stages that do work, in execution order.
    pub const ORDERED: [PipelineStage; 6] = [
        PipelineStage::Initializing,
        PipelineStage::Inspection,
        PipelineStage::Cleaning,
        PipelineStage::Exploration,
        PipelineStage::DashboardMetrics,
        PipelineStage::ReportWriting,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Inspection => "Inspecting Dataset",
            Self::Cleaning => "Cleaning Data",
            Self::Exploration => "Exploring Churn",
            Self::DashboardMetrics => "Computing Dashboard Metrics",
            Self::ReportWriting => "Writing Reports",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall pipeline (0.0 - 1.0).
    ///
    /// Working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Inspection => 0.13,
            Self::Cleaning => 0.30,
            Self::Exploration => 0.25,
            Self::DashboardMetrics => 0.15,
            Self::ReportWriting => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Inspection => 0.02,
            Self::Cleaning => 0.15,
            Self::Exploration => 0.45,
            Self::DashboardMetrics => 0.70,
            Self::ReportWriting => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Optional sub-stage description (e.g., "Field: Total day minutes")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a new progress update with sub-stage information.
    pub fn with_sub_stage(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates during a pipeline run.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread while the caller keeps observing it.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::Cleaning, 0.5, "Cleaning...");
        assert_eq!(update.stage, PipelineStage::Cleaning);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.30).abs() < 1e-6);
        assert_eq!(update.message, "Cleaning...");
    }

    #[test]
    fn test_progress_update_with_sub_stage() {
        let update = ProgressUpdate::with_sub_stage(
            PipelineStage::ReportWriting,
            "06_churn_by_state.csv",
            1.0,
            "Wrote state table",
        );
        assert_eq!(update.sub_stage, Some("06_churn_by_state.csv".to_string()));
        assert!((update.progress - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done!");
        assert_eq!(update.stage, PipelineStage::Complete);
        assert_eq!(update.progress, 1.0);
        assert_eq!(update.stage_progress, 1.0);
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Inspection, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_weights_sum() {
        let total_weight: f32 = PipelineStage::ORDERED.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        for pair in PipelineStage::ORDERED.windows(2) {
            let expected = pair[0].base_progress() + pair[0].weight();
            assert!((pair[1].base_progress() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        let stage_expectations = [
            (PipelineStage::Initializing, "\"initializing\""),
            (PipelineStage::Inspection, "\"inspection\""),
            (PipelineStage::Cleaning, "\"cleaning\""),
            (PipelineStage::Exploration, "\"exploration\""),
            (PipelineStage::DashboardMetrics, "\"dashboard_metrics\""),
            (PipelineStage::ReportWriting, "\"report_writing\""),
            (PipelineStage::Complete, "\"complete\""),
            (PipelineStage::Failed, "\"failed\""),
        ];

        for (stage, expected_json) in stage_expectations {
            let json = serde_json::to_string(&stage).expect("Should serialize");
            assert_eq!(json, expected_json);
        }
    }

    #[test]
    fn test_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        let handle = std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(
                PipelineStage::Exploration,
                0.5,
                "Test from background thread",
            ));
        });

        handle.join().expect("Thread should not panic");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
