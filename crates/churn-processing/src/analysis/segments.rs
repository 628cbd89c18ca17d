//! Churn grouping and risk segmentation shared by the analysis and
//! dashboard stages.

use crate::error::{ChurnError, Result};
use crate::frame::{FieldFrame, display_values};
use crate::schema::Field;
use crate::utils::percentage;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate column names of [`churn_by_column`].
const TOTAL: &str = "total";
const CHURNERS: &str = "churners";

/// Key column of [`churn_by_tag`].
const TAG: &str = "group";

/// Churn counts for one group of customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnBreakdown {
    pub group: String,
    pub churners: usize,
    pub total: usize,
    pub churn_rate_percent: f64,
}

impl ChurnBreakdown {
    pub fn new(group: impl Into<String>, churners: usize, total: usize) -> Self {
        Self {
            group: group.into(),
            churners,
            total,
            churn_rate_percent: percentage(churners, total),
        }
    }
}

/// Churn-risk tier of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskSegment {
    Low,
    Medium,
    High,
}

impl RiskSegment {
    pub const ALL: [RiskSegment; 3] = [RiskSegment::Low, RiskSegment::Medium, RiskSegment::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|segment| segment.as_str() == label)
    }
}

impl fmt::Display for RiskSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for [`assign_risk_segments`].
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    /// Calls from which an international-plan customer is high risk
    pub high_service_calls: f64,
    /// Calls from which any customer is at least medium risk
    pub medium_service_calls: f64,
}

/// Churn labels of every row, or `ColumnNotFound` when there is no label.
pub fn churn_labels(df: &DataFrame) -> Result<BooleanChunked> {
    df.field_bool(Field::Churn)?
        .ok_or_else(|| ChurnError::ColumnNotFound(Field::Churn.header().to_string()))
}

/// Whether a plan flag cell reads "Yes". All false when the field is absent.
pub(crate) fn plan_flags(df: &DataFrame, field: Field) -> Result<BooleanChunked> {
    let name = PlSmallStr::from(field.header());
    let Some(values) = df.field_str(field)? else {
        return Ok(BooleanChunked::full(name, false, df.height()));
    };
    let flags: Vec<bool> = values
        .into_iter()
        .map(|v| v.is_some_and(|s| s.eq_ignore_ascii_case("yes")))
        .collect();
    Ok(BooleanChunked::from_slice(name, &flags))
}

/// Service-call counts, all null when the field is absent.
pub(crate) fn service_calls(df: &DataFrame) -> Result<Float64Chunked> {
    let name = PlSmallStr::from(Field::ServiceCalls.header());
    Ok(df
        .field_f64(Field::ServiceCalls)?
        .unwrap_or_else(|| Float64Chunked::full_null(name, df.height())))
}

/// Risk segment of every row.
///
/// High: international plan and at least `high_service_calls` calls.
/// Medium: international plan or at least `medium_service_calls` calls.
/// Low otherwise. Missing call counts never meet a threshold.
pub fn assign_risk_segments(
    df: &DataFrame,
    thresholds: RiskThresholds,
) -> Result<Vec<RiskSegment>> {
    let intl = plan_flags(df, Field::InternationalPlan)?;
    let calls = service_calls(df)?;

    Ok(intl
        .into_iter()
        .zip(&calls)
        .map(|(has_intl, calls)| {
            let has_intl = has_intl.unwrap_or(false);
            let calls_at_least = |threshold: f64| calls.is_some_and(|c| c >= threshold);
            if has_intl && calls_at_least(thresholds.high_service_calls) {
                RiskSegment::High
            } else if has_intl || calls_at_least(thresholds.medium_service_calls) {
                RiskSegment::Medium
            } else {
                RiskSegment::Low
            }
        })
        .collect())
}

/// Group rows by the `key` column and count churners per group.
///
/// Rows without a key or without a churn label are skipped. Groups come back
/// sorted by key: numerically for numeric keys, lexically for text.
pub fn churn_by_column(df: &DataFrame, key: &str) -> Result<Vec<ChurnBreakdown>> {
    let churn = Field::Churn.header();
    let grouped = df
        .clone()
        .lazy()
        .select([col(key), col(churn)])
        .filter(col(key).is_not_null().and(col(churn).is_not_null()))
        .group_by([col(key)])
        .agg([
            len().alias(TOTAL),
            col(churn).cast(DataType::UInt32).sum().alias(CHURNERS),
        ])
        .sort([key], SortMultipleOptions::default())
        .collect()?;

    let keys = display_values(grouped.column(key)?.as_materialized_series())?;
    let totals = grouped.column(TOTAL)?.cast(&DataType::UInt64)?;
    let churners = grouped.column(CHURNERS)?.cast(&DataType::UInt64)?;

    Ok(keys
        .into_iter()
        .zip(totals.u64()?)
        .zip(churners.u64()?)
        .map(|((key, total), churners)| {
            ChurnBreakdown::new(
                key.unwrap_or_default(),
                churners.unwrap_or(0) as usize,
                total.unwrap_or(0) as usize,
            )
        })
        .collect())
}

/// Churn breakdown by the value of a field, empty when the field is absent.
pub fn churn_by_field(df: &DataFrame, field: Field) -> Result<Vec<ChurnBreakdown>> {
    if !df.has_field(field) {
        return Ok(Vec::new());
    }
    churn_by_column(df, field.header())
}

/// Churn per tag for rows carrying one, ordered as in `order`.
///
/// `tags` runs parallel to `labels`; rows tagged `None` are skipped.
pub(crate) fn churn_by_tag(
    labels: &BooleanChunked,
    tags: Vec<Option<&str>>,
    order: &[&str],
) -> Result<Vec<ChurnBreakdown>> {
    let frame = DataFrame::new(vec![
        Series::new(TAG.into(), tags).into_column(),
        labels.clone().with_name(Field::Churn.header().into()).into_column(),
    ])?;
    let mut groups = churn_by_column(&frame, TAG)?;
    groups.sort_by_key(|g| order.iter().position(|tag| *tag == g.group));
    Ok(groups)
}

/// Churn rate over rows selected by `mask`, `None` when no labelled row
/// is selected.
pub fn churn_rate_where(labels: &BooleanChunked, mask: &BooleanChunked) -> Result<Option<f64>> {
    let selected = labels.filter(&mask.fill_null_with_values(false)?)?;
    let total = selected.len() - selected.null_count();
    Ok((total > 0).then(|| percentage(selected.num_trues(), total)))
}
