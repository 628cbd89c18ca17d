//! Data cleaning stage.
//!
//! This module provides functionality for:
//! - Removing duplicate rows
//! - Counting missing values
//! - Standardizing state codes and plan flags
//! - Dropping rows with negative usage values
//! - Reporting extreme outliers, rate inconsistencies and out-of-range values
//!
//! Only duplicates and negative rows are removed. Every other check is
//! reported in the [`CleaningReport`] and leaves the rows untouched.

mod sanitizers;

use crate::config::PipelineConfig;
use crate::quality::{
    CategoryRateCheck, CheckStatus, DataQualityValidator, MissingValues, NegativeSummary,
    OutlierReport, RangeCheck,
};
use crate::error::Result;
use crate::schema::Field;
use crate::utils::percentage;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Summary of the cleaning stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub original_rows: usize,
    pub final_rows: usize,
    pub duplicates_removed: usize,
    /// Missing cells after deduplication, before any other step
    pub missing_values: MissingValues,
    /// Text cells rewritten by categorical standardization
    pub categoricals_standardized: usize,
    pub negative_values: NegativeSummary,
    /// Evaluated outlier checks, one per numeric field present
    pub outliers: Vec<OutlierReport>,
    pub rate_checks: Vec<CategoryRateCheck>,
    pub range_checks: Vec<RangeCheck>,
    /// Share of non-missing cells in the cleaned data
    pub completeness_percent: f64,
    /// Share of original rows removed
    pub data_loss_percent: f64,
    /// Human-readable log of what was done
    pub actions: Vec<String>,
}

impl CleaningReport {
    /// Total extreme outliers across all fields.
    pub fn total_outliers(&self) -> usize {
        self.outliers.iter().map(|o| o.outliers).sum()
    }

    /// Total rate-consistency violations across evaluated categories.
    pub fn total_rate_violations(&self) -> usize {
        self.rate_checks
            .iter()
            .filter_map(|c| c.check.evaluated())
            .map(|r| r.violations)
            .sum()
    }
}

/// Data cleaner for the churn dataset.
pub struct DataCleaner {
    validator: DataQualityValidator,
    non_negative_fields: Vec<Field>,
    standardize_categoricals: bool,
}

impl DataCleaner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            validator: DataQualityValidator::new(config),
            non_negative_fields: config.non_negative_fields.clone(),
            standardize_categoricals: config.standardize_categoricals,
        }
    }

    pub fn validator(&self) -> &DataQualityValidator {
        &self.validator
    }

    /// Run every cleaning step in order and return the cleaned frame.
    pub fn clean(&self, df: DataFrame) -> Result<(DataFrame, CleaningReport)> {
        let mut report = CleaningReport {
            original_rows: df.height(),
            ..Default::default()
        };

        info!("Performing data cleaning...");

        // 1. Remove duplicate rows
        let dedup = self.validator.deduplicate(&df)?;
        report.duplicates_removed = dedup.removed;
        if dedup.removed > 0 {
            report.actions.push(format!(
                "Removed {} duplicate rows ({:.1}%)",
                dedup.removed,
                percentage(dedup.removed, report.original_rows)
            ));
        } else {
            report.actions.push("No duplicate rows found".to_string());
        }
        debug!("Removed {} duplicate rows", dedup.removed);
        let mut df = dedup.frame;

        // 2. Missing values are reported, not imputed
        report.missing_values = self.validator.count_missing(&df);
        if report.missing_values.total > 0 {
            for column in report.missing_values.columns.iter().filter(|c| c.missing > 0) {
                debug!("{}: {} missing values", column.column, column.missing);
            }
            report.actions.push(format!(
                "Found {} missing values (kept)",
                report.missing_values.total
            ));
        } else {
            report.actions.push("No missing values found".to_string());
        }

        // 3. Categorical standardization
        if self.standardize_categoricals {
            let changed = sanitizers::standardize_state(&mut df)?
                + sanitizers::standardize_plan_flags(&mut df)?;
            report.categoricals_standardized = changed;
            report
                .actions
                .push(format!("Standardized {} categorical values", changed));
        }

        // 4. Negative values
        let filter = self
            .validator
            .reject_negative(&df, &self.non_negative_fields)?;
        for field in &filter.summary.fields {
            match field.violations {
                CheckStatus::Evaluated(count) if count > 0 => {
                    warn!("{}: {} negative values", field.field, count)
                }
                CheckStatus::NotEvaluated => {
                    debug!("{}: not present, negative check skipped", field.field)
                }
                _ => {}
            }
        }
        if filter.summary.rows_removed > 0 {
            report.actions.push(format!(
                "Removed {} rows with negative values",
                filter.summary.rows_removed
            ));
        } else {
            report.actions.push("No negative values found".to_string());
        }
        report.negative_values = filter.summary;
        let df = filter.frame;

        // 5. Extreme outliers, detection only
        for field in Field::ALL.into_iter().filter(Field::is_numeric) {
            if let CheckStatus::Evaluated(outliers) =
                self.validator.detect_extreme_outliers(&df, field)?
            {
                report.outliers.push(outliers);
            }
        }
        for outlier in report.outliers.iter().filter(|o| o.outliers > 0) {
            debug!("{}: {} extreme outliers (kept)", outlier.field, outlier.outliers);
        }
        report.actions.push(format!(
            "Detected {} extreme outliers (kept)",
            report.total_outliers()
        ));

        // 6. Rate consistency, reporting only
        report.rate_checks = self.validator.check_all_rates(&df)?;
        for check in &report.rate_checks {
            if let Some(result) = check.check.evaluated() {
                debug!(
                    "{} rate: median {:?}, {} inconsistent rows",
                    check.category.display_name(),
                    result.median_rate,
                    result.violations
                );
            }
        }

        // 7. Expected ranges, reporting only
        report.range_checks = self.validator.check_expected_ranges(&df)?;
        for check in &report.range_checks {
            if let CheckStatus::Evaluated(count) = check.violations
                && count > 0
            {
                warn!("{}: {} values outside expected range", check.field, count);
            }
        }

        report.final_rows = df.height();
        let final_missing = self.validator.count_missing(&df);
        let cells = df.height() * df.width();
        report.completeness_percent = if cells == 0 {
            100.0
        } else {
            100.0 - percentage(final_missing.total, cells)
        };
        report.data_loss_percent =
            percentage(report.original_rows - report.final_rows, report.original_rows);

        info!(
            "Cleaning complete: {} -> {} rows ({:.2}% loss)",
            report.original_rows, report.final_rows, report.data_loss_percent
        );

        Ok((df, report))
    }
}
