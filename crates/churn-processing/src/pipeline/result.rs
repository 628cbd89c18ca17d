//! Pipeline output types.

use crate::analysis::EdaReport;
use crate::cleaner::CleaningReport;
use crate::metrics::DashboardReport;
use crate::profiler::InspectionSummary;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub inspection: InspectionSummary,
    pub cleaning: CleaningReport,
    pub exploration: EdaReport,
    pub dashboard: DashboardReport,
    /// Cleaned frame, not serialized
    #[serde(skip)]
    pub cleaned: DataFrame,
    pub duration_ms: u64,
    /// Files written by the report stage, empty when saving is disabled
    pub written_files: Vec<PathBuf>,
}

/// Compact view of a run, used for CLI output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub negative_rows_removed: usize,
    pub missing_values: usize,
    pub extreme_outliers: usize,
    pub rate_violations: usize,
    pub data_loss_percent: f64,
    pub completeness_percent: f64,
    pub churn_rate_percent: f64,
    pub estimated_revenue_loss: f64,
    pub duration_ms: u64,
    pub files_written: usize,
}

impl PipelineResult {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            rows_before: self.cleaning.original_rows,
            rows_after: self.cleaning.final_rows,
            duplicates_removed: self.cleaning.duplicates_removed,
            negative_rows_removed: self.cleaning.negative_values.rows_removed,
            missing_values: self.cleaning.missing_values.total,
            extreme_outliers: self.cleaning.total_outliers(),
            rate_violations: self.cleaning.total_rate_violations(),
            data_loss_percent: self.cleaning.data_loss_percent,
            completeness_percent: self.cleaning.completeness_percent,
            churn_rate_percent: self.dashboard.kpis.churn_rate_percent,
            estimated_revenue_loss: self.dashboard.kpis.estimated_revenue_loss,
            duration_ms: self.duration_ms,
            files_written: self.written_files.len(),
        }
    }
}

/// Result of a dry run: inspection and cleaning checks, nothing written.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub inspection: InspectionSummary,
    pub cleaning: CleaningReport,
}
