//! Result types produced by the data-quality validator.

use crate::schema::{Field, UsageCategory};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Outcome of a check that depends on a field being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum CheckStatus<T> {
    Evaluated(T),
    /// The field the check needs is absent from the schema.
    NotEvaluated,
}

impl<T> CheckStatus<T> {
    pub fn is_evaluated(&self) -> bool {
        matches!(self, Self::Evaluated(_))
    }

    pub fn evaluated(&self) -> Option<&T> {
        match self {
            Self::Evaluated(value) => Some(value),
            Self::NotEvaluated => None,
        }
    }
}

/// Result of removing duplicate rows.
#[derive(Debug, Clone)]
pub struct Deduplication {
    pub frame: DataFrame,
    pub removed: usize,
}

/// Negative-value count for one listed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolations {
    pub field: Field,
    pub violations: CheckStatus<usize>,
}

/// Serializable summary of a negative-value filter pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegativeSummary {
    pub fields: Vec<FieldViolations>,
    pub rows_removed: usize,
}

impl NegativeSummary {
    /// Total violations across evaluated fields. A row violating two fields
    /// counts twice here but is removed once.
    pub fn total_violations(&self) -> usize {
        self.fields
            .iter()
            .filter_map(|f| f.violations.evaluated())
            .sum()
    }
}

/// Result of filtering rows with negative values.
#[derive(Debug, Clone)]
pub struct NegativeFilter {
    pub frame: DataFrame,
    pub summary: NegativeSummary,
}

/// Quartile bounds of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Extreme-outlier count for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub field: Field,
    /// `None` when the field has no values.
    pub bounds: Option<OutlierBounds>,
    pub outliers: usize,
}

/// Charge-versus-minutes consistency for one usage category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConsistency {
    pub minutes_field: Field,
    pub charge_field: Field,
    /// Median of per-row implied rates, `None` when no row has both values.
    pub median_rate: Option<f64>,
    /// Rows with both minutes and charge present.
    pub rows_checked: usize,
    pub violations: usize,
}

/// A rate consistency result tagged with its usage category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRateCheck {
    pub category: UsageCategory,
    pub check: CheckStatus<RateConsistency>,
}

/// Missing cells in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

/// Missing value counts for a whole frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    pub columns: Vec<ColumnMissing>,
    pub total: usize,
}

impl MissingValues {
    pub fn for_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.column == name)
            .map(|c| c.missing)
    }
}

/// Count of values outside an expected range for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCheck {
    pub field: Field,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub violations: CheckStatus<usize>,
}
