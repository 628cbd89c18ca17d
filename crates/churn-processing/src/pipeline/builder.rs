//! Main churn pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating inspection, cleaning, exploration, dashboard metrics and
//! report writing.

use crate::analysis::ExploratoryAnalysis;
use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::metrics::DashboardMetrics;
use crate::pipeline::log::ExecutionRecorder;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::result::{PipelineResult, PreviewResult};
use crate::profiler::DataProfiler;
use crate::reporting::{ReportBundle, ReportWriter};
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The churn processing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use churn_processing::{FileExecutionLog, Pipeline, PipelineConfig, read_dataset};
/// use std::sync::Arc;
///
/// let log = Arc::new(FileExecutionLog::new("outputs/execution_log.txt")?);
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().output_dir("reports").build()?)
///     .recorder(log)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(read_dataset("data/raw/telecom_churn.csv")?)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    recorder: Option<Arc<dyn ExecutionRecorder>>,
    cleaner: DataCleaner,
    analysis: ExploratoryAnalysis,
    metrics: DashboardMetrics,
    writer: ReportWriter,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on a schema-checked frame.
    ///
    /// Reports are written only when `save_to_disk` is set.
    pub fn run(&self, df: DataFrame) -> Result<PipelineResult> {
        match self.run_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                self.record(
                    "complete",
                    &format!(
                        "{} rows processed in {} ms",
                        result.cleaning.final_rows, result.duration_ms
                    ),
                );
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                self.record("failed", &e.to_string());
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Run inspection and the cleaning checks without analysis or writing.
    pub fn preview(&self, df: DataFrame) -> Result<PreviewResult> {
        let inspection = DataProfiler::inspect(&df, self.cleaner.validator())?;
        let (_, cleaning) = self.cleaner.clean(df)?;
        Ok(PreviewResult {
            inspection,
            cleaning,
        })
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn record(&self, event: &str, detail: &str) {
        if let Some(recorder) = &self.recorder {
            recorder.record(event, detail);
        }
    }

    fn start_stage(&self, stage: PipelineStage, message: &str) {
        info!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
    }

    fn finish_stage(&self, stage: PipelineStage, event: &str, detail: String) {
        self.record(event, &detail);
        self.report_progress(ProgressUpdate::new(stage, 1.0, detail));
    }

    fn run_internal(&self, df: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();

        self.start_stage(PipelineStage::Initializing, "Starting churn pipeline...");
        self.finish_stage(
            PipelineStage::Initializing,
            "initializing",
            format!("{} rows x {} columns loaded", df.height(), df.width()),
        );

        // Step 1: Inspection
        self.start_stage(PipelineStage::Inspection, "Step 1: Inspecting dataset...");
        let inspection = DataProfiler::inspect(&df, self.cleaner.validator())?;
        self.finish_stage(
            PipelineStage::Inspection,
            "inspection",
            format!(
                "{} missing values, {} duplicate rows",
                inspection.missing.total, inspection.duplicate_rows
            ),
        );

        // Step 2: Cleaning
        self.start_stage(PipelineStage::Cleaning, "Step 2: Cleaning dataset...");
        let (cleaned, cleaning) = self.cleaner.clean(df)?;
        self.finish_stage(
            PipelineStage::Cleaning,
            "cleaning",
            format!(
                "{} -> {} rows ({:.2}% loss)",
                cleaning.original_rows, cleaning.final_rows, cleaning.data_loss_percent
            ),
        );

        // Step 3: Exploratory analysis
        self.start_stage(PipelineStage::Exploration, "Step 3: Exploring churn...");
        let exploration = self.analysis.analyze(&cleaned)?;
        self.finish_stage(
            PipelineStage::Exploration,
            "exploration",
            format!(
                "churn rate {:.2}%, {} notable correlations",
                exploration.general_metrics.churn_rate_percent,
                exploration.correlations.iter().filter(|c| c.notable).count()
            ),
        );

        // Step 4: Dashboard metrics
        self.start_stage(
            PipelineStage::DashboardMetrics,
            "Step 4: Computing dashboard metrics...",
        );
        let dashboard = self.metrics.compute(&cleaned)?;
        self.finish_stage(
            PipelineStage::DashboardMetrics,
            "dashboard_metrics",
            format!(
                "{} plan combinations, estimated revenue loss {:.2}",
                dashboard.plan_combinations.len(),
                dashboard.kpis.estimated_revenue_loss
            ),
        );

        // Step 5: Reports
        let written_files = if self.config.save_to_disk {
            self.start_stage(PipelineStage::ReportWriting, "Step 5: Writing reports...");
            let written = self.writer.write_all(&ReportBundle {
                inspection: &inspection,
                cleaning: &cleaning,
                exploration: &exploration,
                dashboard: &dashboard,
                cleaned: &cleaned,
            })?;
            self.finish_stage(
                PipelineStage::ReportWriting,
                "report_writing",
                format!(
                    "{} files written to {}",
                    written.len(),
                    self.writer.layout().root.display()
                ),
            );
            written
        } else {
            info!("Step 5: Skipping report writing (disabled)");
            Vec::new()
        };

        Ok(PipelineResult {
            inspection,
            cleaning,
            exploration,
            dashboard,
            cleaned,
            duration_ms: start_time.elapsed().as_millis() as u64,
            written_files,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    recorder: Option<Arc<dyn ExecutionRecorder>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the execution log collaborator.
    ///
    /// Every completed stage records one event. Without a recorder nothing
    /// is recorded.
    pub fn recorder(mut self, recorder: Arc<dyn ExecutionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            cleaner: DataCleaner::new(&config),
            analysis: ExploratoryAnalysis::new(&config),
            metrics: DashboardMetrics::new(&config),
            writer: ReportWriter::new(&config),
            config,
            progress_reporter: self.progress_reporter,
            recorder: self.recorder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::numeric_frame;
    use crate::pipeline::log::MemoryRecorder;
    use crate::schema::Field;
    use polars::prelude::df;
    use std::sync::Mutex;

    fn frame() -> DataFrame {
        df![
            "International plan" => ["No", "No", "Yes", "No", "No"],
            "Total day minutes" => [100.0, 100.0, 200.0, -1.0, 150.0],
            "Total day charge" => [17.0, 17.0, 34.0, 0.0, 25.5],
            "Customer service calls" => [1.0, 1.0, 1.0, 1.0, 1.0],
            "Churn" => [false, false, true, false, false],
        ]
        .unwrap()
    }

    fn in_memory_config() -> PipelineConfig {
        PipelineConfig::builder().save_to_disk(false).build().unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.recorder.is_none());
        assert_eq!(pipeline.config.outlier_iqr_multiplier, 3.0);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            rate_epsilon: 0.0,
            ..Default::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_run_in_memory() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();
        let result = pipeline.run(frame()).unwrap();

        assert_eq!(result.cleaning.duplicates_removed, 1);
        assert_eq!(result.cleaning.negative_values.rows_removed, 1);
        assert_eq!(result.cleaned.height(), 3);
        assert!(result.written_files.is_empty());

        let summary = result.summary();
        assert_eq!(summary.rows_before, 5);
        assert_eq!(summary.rows_after, 3);
        assert_eq!(summary.rate_violations, 0);
        assert!((summary.churn_rate_percent - 33.33).abs() < 1e-9);
    }

    #[test]
    fn test_run_records_one_event_per_stage() {
        let recorder = Arc::new(MemoryRecorder::new());
        let pipeline = Pipeline::builder()
            .config(in_memory_config())
            .recorder(recorder.clone())
            .build()
            .unwrap();
        pipeline.run(frame()).unwrap();

        let events: Vec<String> = recorder.events().into_iter().map(|(e, _)| e).collect();
        assert_eq!(
            events,
            vec![
                "initializing",
                "inspection",
                "cleaning",
                "exploration",
                "dashboard_metrics",
                "complete"
            ]
        );
    }

    #[test]
    fn test_run_reports_progress() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let pipeline = Pipeline::builder()
            .config(in_memory_config())
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
            .build()
            .unwrap();
        pipeline.run(frame()).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&PipelineStage::Initializing));
        assert_eq!(stages.last(), Some(&PipelineStage::Complete));
        assert!(!stages.contains(&PipelineStage::ReportWriting));
    }

    #[test]
    fn test_run_without_churn_fails() {
        let recorder = Arc::new(MemoryRecorder::new());
        let pipeline = Pipeline::builder()
            .config(in_memory_config())
            .recorder(recorder.clone())
            .build()
            .unwrap();
        let df = numeric_frame(&[(Field::DayMinutes, &[Some(1.0), Some(2.0)])]).unwrap();

        let err = pipeline.run(df).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        let events = recorder.events();
        assert_eq!(events.last().map(|(e, _)| e.as_str()), Some("failed"));
    }

    #[test]
    fn test_preview() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();
        let preview = pipeline.preview(frame()).unwrap();
        assert_eq!(preview.inspection.duplicate_rows, 1);
        assert_eq!(preview.cleaning.final_rows, 3);
    }
}
