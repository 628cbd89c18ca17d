//! Telecom Churn Processing Library
//!
//! A data-quality and churn analytics pipeline built with Rust and Polars.
//!
//! # Overview
//!
//! This library takes a telecom customer dataset from a raw CSV file to the
//! tables a churn dashboard consumes:
//!
//! - **Typed Schema**: Known columns are enumerated [`Field`]s, renamed and cast
//!   once at load, then read from the Polars `DataFrame` through [`FieldFrame`]
//! - **Inspection**: Column types, missing values, duplicates and churn distribution
//! - **Data-Quality Validation**: Deduplication, negative-value filtering,
//!   extreme-outlier detection and charge/minutes rate consistency
//! - **Exploratory Analysis**: Statistics, correlations, churn breakdowns and risk segments
//! - **Dashboard Metrics**: KPIs, revenue tables and plan combinations
//! - **Reporting**: JSON and CSV outputs in a fixed directory layout
//! - **Progress Reporting and Execution Log**: Injected collaborators, no global state
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_processing::{Pipeline, PipelineConfig, read_dataset};
//!
//! let df = read_dataset("data/raw/telecom_churn.csv")?;
//!
//! let config = PipelineConfig::builder()
//!     .output_dir("reports")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(df)?;
//!
//! println!("Churn rate: {:.2}%", result.dashboard.kpis.churn_rate_percent);
//! ```
//!
//! # Using the validator directly
//!
//! ```rust,ignore
//! use churn_processing::{DataQualityValidator, Field};
//!
//! let validator = DataQualityValidator::default();
//! let dedup = validator.deduplicate(&df)?;
//! let filtered = validator.reject_negative(&dedup.frame, &Field::NON_NEGATIVE)?;
//! let outliers = validator.detect_extreme_outliers(&filtered.frame, Field::DayMinutes)?;
//! let rates = validator.check_rate_consistency(
//!     &filtered.frame,
//!     Field::DayMinutes,
//!     Field::DayCharge,
//! )?;
//! ```

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{ChurnBreakdown, EdaReport, ExploratoryAnalysis, RiskSegment};
pub use cleaner::{CleaningReport, DataCleaner};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{ChurnError, Result as ChurnResult, ResultExt};
pub use frame::FieldFrame;
pub use ingest::{apply_schema, load_csv_with_fallbacks, read_dataset};
pub use metrics::{DashboardMetrics, DashboardReport};
pub use pipeline::{
    ClosureProgressReporter, ExecutionRecorder, FileExecutionLog, MemoryRecorder, Pipeline,
    PipelineBuilder, PipelineResult, PipelineStage, PreviewResult, ProgressReporter,
    ProgressUpdate, RunSummary, TracingRecorder,
};
pub use profiler::{DataProfiler, InspectionSummary};
pub use quality::{CheckStatus, DataQualityValidator};
pub use reporting::{OutputLayout, ReportWriter};
pub use schema::{Field, FieldKind, UsageCategory};
