//! Dataset inspection.
//!
//! This module provides functionality for profiling the raw frame:
//! - Column classification (numeric vs categorical)
//! - Unique values per column
//! - Missing values and duplicate rows
//! - Churn distribution of the target column
//!
//! Descriptive statistics used by later stages live in [`statistics`].

pub mod statistics;

use crate::error::Result;
use crate::frame::{FieldFrame, display_values};
use crate::quality::{DataQualityValidator, MissingValues};
use crate::schema::{Field, SchemaReport};
use crate::utils::{is_numeric_dtype, percentage};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Columns with at most this many distinct values have them listed.
const MAX_LISTED_VALUES: usize = 10;

/// How many of the most frequent states are reported.
const TOP_STATES: usize = 5;

/// Occurrences of one distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Overall churn severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnLevel {
    /// Below 10%
    Low,
    /// 10% up to 20%
    Moderate,
    /// 20% and above
    High,
}

impl ChurnLevel {
    pub fn from_rate(rate_percent: f64) -> Self {
        if rate_percent < 10.0 {
            Self::Low
        } else if rate_percent < 20.0 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for ChurnLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Distribution of the churn label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnOverview {
    pub retained: usize,
    pub churned: usize,
    pub churn_rate_percent: f64,
    pub level: ChurnLevel,
}

/// Per-column inspection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub unique_count: usize,
    /// Distinct values in order of first appearance, for low-cardinality
    /// columns other than `State`.
    pub distinct_values: Option<Vec<String>>,
}

/// Result of the inspection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub schema: SchemaReport,
    pub missing: MissingValues,
    pub duplicate_rows: usize,
    /// `None` when the dataset has no `Churn` column.
    pub churn: Option<ChurnOverview>,
    pub column_profiles: Vec<ColumnProfile>,
    pub top_states: Vec<ValueCount>,
}

/// Data profiler for inspecting the loaded dataset.
pub struct DataProfiler;

impl DataProfiler {
    /// Inspect a frame without modifying it.
    pub fn inspect(df: &DataFrame, validator: &DataQualityValidator) -> Result<InspectionSummary> {
        info!("Inspecting dataset: {} rows x {} columns", df.height(), df.width());

        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        let mut column_profiles = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().to_string();
            if is_numeric_dtype(column.dtype()) {
                numeric_columns.push(name.clone());
            } else {
                categorical_columns.push(name.clone());
            }
            column_profiles.push(Self::profile_column(column, name)?);
        }

        let missing = validator.count_missing(df);
        let duplicate_rows = validator.deduplicate(df)?.removed;
        debug!(
            "{} missing values, {} duplicate rows",
            missing.total, duplicate_rows
        );

        let top_states = match df.field_column(Field::State) {
            Some(column) => {
                let mut counts = value_counts(column)?;
                counts.truncate(TOP_STATES);
                counts
            }
            None => Vec::new(),
        };

        let churn = Self::churn_overview(df)?;
        if let Some(ref churn) = churn {
            info!(
                "Churn rate: {:.2}% ({} level)",
                churn.churn_rate_percent, churn.level
            );
        }

        Ok(InspectionSummary {
            total_rows: df.height(),
            total_columns: df.width(),
            numeric_columns,
            categorical_columns,
            schema: df.schema_report(),
            missing,
            duplicate_rows,
            churn,
            column_profiles,
            top_states,
        })
    }

    fn profile_column(column: &Column, name: String) -> Result<ColumnProfile> {
        let series = column.as_materialized_series();
        let distinct: Vec<String> = display_values(&series.drop_nulls().unique_stable()?)?
            .into_iter()
            .flatten()
            .collect();
        let unique_count = distinct.len();
        let listed =
            unique_count <= MAX_LISTED_VALUES && Field::from_header(&name) != Some(Field::State);

        Ok(ColumnProfile {
            dtype: format!("{:?}", column.dtype()),
            name,
            unique_count,
            distinct_values: listed.then_some(distinct),
        })
    }

    /// Churn counts over rows with a present label.
    pub fn churn_overview(df: &DataFrame) -> Result<Option<ChurnOverview>> {
        let Some(flags) = df.field_bool(Field::Churn)? else {
            return Ok(None);
        };
        let churned = flags.num_trues();
        let retained = flags.num_falses();
        let churn_rate_percent = percentage(churned, churned + retained);
        Ok(Some(ChurnOverview {
            retained,
            churned,
            churn_rate_percent,
            level: ChurnLevel::from_rate(churn_rate_percent),
        }))
    }
}

/// Value counts of a column, most frequent first, ties broken by value.
///
/// Missing cells are not counted.
pub(crate) fn value_counts(column: &Column) -> Result<Vec<ValueCount>> {
    let non_null = column.as_materialized_series().drop_nulls();
    if non_null.is_empty() {
        return Ok(Vec::new());
    }

    let counted = non_null.value_counts(true, false, "count".into(), false)?;
    let values = display_values(counted.column(non_null.name())?.as_materialized_series())?;
    let counts = counted.column("count")?.cast(&DataType::UInt64)?;

    let mut counts: Vec<ValueCount> = values
        .into_iter()
        .zip(counts.u64()?)
        .filter_map(|(value, count)| {
            Some(ValueCount {
                value: value?,
                count: count? as usize,
            })
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::numeric_frame;

    fn frame() -> DataFrame {
        df![
            "State" => ["KS", "OH", "KS", "NJ", "OH"],
            "Customer service calls" => [1.0, 2.0, 1.0, 4.0, 0.0],
            "Churn" => [Some(false), Some(true), Some(false), Some(false), None],
        ]
        .unwrap()
    }

    fn inspect(df: &DataFrame) -> InspectionSummary {
        DataProfiler::inspect(df, &DataQualityValidator::default()).unwrap()
    }

    #[test]
    fn test_inspect_summary() {
        let summary = inspect(&frame());

        assert_eq!(summary.total_rows, 5);
        assert_eq!(summary.total_columns, 3);
        assert_eq!(summary.numeric_columns, vec!["Customer service calls".to_string()]);
        assert_eq!(summary.categorical_columns.len(), 2);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.missing.total, 1);
    }

    #[test]
    fn test_inspect_churn_overview() {
        let churn = inspect(&frame()).churn.unwrap();
        assert_eq!(churn.churned, 1);
        assert_eq!(churn.retained, 3);
        assert_eq!(churn.churn_rate_percent, 25.0);
        assert_eq!(churn.level, ChurnLevel::High);
    }

    #[test]
    fn test_inspect_column_profiles() {
        let summary = inspect(&frame());

        let state = &summary.column_profiles[0];
        assert_eq!(state.unique_count, 3);
        assert_eq!(state.distinct_values, None);
        assert_eq!(state.dtype, "String");

        let calls = &summary.column_profiles[1];
        assert_eq!(
            calls.distinct_values,
            Some(vec!["1".to_string(), "2".to_string(), "4".to_string(), "0".to_string()])
        );

        assert_eq!(
            summary.top_states[0],
            ValueCount {
                value: "KS".to_string(),
                count: 2
            }
        );
        assert_eq!(summary.top_states[1].value, "OH");
        assert_eq!(summary.top_states[2].value, "NJ");
    }

    #[test]
    fn test_value_counts_skips_missing() {
        let df = df!["State" => [Some("NY"), None, Some("NY"), None]].unwrap();
        let counts = value_counts(df.column("State").unwrap()).unwrap();
        assert_eq!(
            counts,
            vec![ValueCount {
                value: "NY".to_string(),
                count: 2
            }]
        );

        let empty = df!["State" => [None::<&str>]].unwrap();
        assert!(value_counts(empty.column("State").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_churn_level_thresholds() {
        assert_eq!(ChurnLevel::from_rate(9.99), ChurnLevel::Low);
        assert_eq!(ChurnLevel::from_rate(10.0), ChurnLevel::Moderate);
        assert_eq!(ChurnLevel::from_rate(14.49), ChurnLevel::Moderate);
        assert_eq!(ChurnLevel::from_rate(20.0), ChurnLevel::High);
    }

    #[test]
    fn test_no_churn_column() {
        let df = numeric_frame(&[(Field::DayCalls, &[Some(1.0)])]).unwrap();
        let summary = inspect(&df);
        assert!(summary.churn.is_none());
        assert!(summary.top_states.is_empty());
    }
}
