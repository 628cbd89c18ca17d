use super::checks::{
    CategoryRateCheck, CheckStatus, ColumnMissing, Deduplication, FieldViolations,
    MissingValues, NegativeFilter, NegativeSummary, OutlierBounds, OutlierReport, RangeCheck,
    RateConsistency,
};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::frame::FieldFrame;
use crate::profiler::statistics::{median, quartiles};
use crate::schema::{Field, UsageCategory};
use polars::prelude::*;

/// Rule-based checks run during cleaning.
///
/// Every operation is a pure function of its input frame. Per-row problems
/// are reported as counts; a check whose field is absent is reported
/// [`CheckStatus::NotEvaluated`].
#[derive(Debug, Clone)]
pub struct DataQualityValidator {
    iqr_multiplier: f64,
    rate_epsilon: f64,
    rate_tolerance_percent: f64,
    account_length_range: (f64, f64),
    max_service_calls: f64,
}

impl Default for DataQualityValidator {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl DataQualityValidator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            iqr_multiplier: config.outlier_iqr_multiplier,
            rate_epsilon: config.rate_epsilon,
            rate_tolerance_percent: config.rate_tolerance_percent,
            account_length_range: (config.account_length_min, config.account_length_max),
            max_service_calls: f64::from(config.max_service_calls),
        }
    }

    /// Remove rows identical to an earlier row across every column.
    ///
    /// The first occurrence is kept and survivors stay in their original
    /// order. Nulls compare equal to each other and `-0.0` equals `0.0`.
    pub fn deduplicate(&self, df: &DataFrame) -> Result<Deduplication> {
        if df.width() == 0 || df.height() == 0 {
            return Ok(Deduplication {
                frame: df.clone(),
                removed: 0,
            });
        }

        let normalized = normalize_signed_zeros(df)?;
        let unique = normalized.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = df.height() - unique.height();
        Ok(Deduplication {
            frame: unique,
            removed,
        })
    }

    /// Drop every row holding a negative value in any of `fields`.
    ///
    /// Missing cells are not violations. Fields absent from the frame are
    /// reported as not evaluated and do not affect filtering.
    pub fn reject_negative(&self, df: &DataFrame, fields: &[Field]) -> Result<NegativeFilter> {
        let mut rejected = BooleanChunked::full("rejected".into(), false, df.height());
        let mut violations = Vec::with_capacity(fields.len());

        for &field in fields {
            let status = match df.field_f64(field)? {
                Some(values) => {
                    let negative = values.lt(0.0).fill_null_with_values(false)?;
                    rejected = &rejected | &negative;
                    CheckStatus::Evaluated(negative.num_trues())
                }
                None => CheckStatus::NotEvaluated,
            };
            violations.push(FieldViolations {
                field,
                violations: status,
            });
        }

        let frame = df.filter(&!&rejected)?;
        let summary = NegativeSummary {
            fields: violations,
            rows_removed: df.height() - frame.height(),
        };
        Ok(NegativeFilter { frame, summary })
    }

    /// Count values outside `[Q1 - k*IQR, Q3 + k*IQR]`.
    ///
    /// Observational only: the frame is borrowed and never filtered.
    pub fn detect_extreme_outliers(
        &self,
        df: &DataFrame,
        field: Field,
    ) -> Result<CheckStatus<OutlierReport>> {
        let Some(values) = df.field_f64(field)? else {
            return Ok(CheckStatus::NotEvaluated);
        };

        let bounds = quartiles(&values)?.map(|(q1, q3)| {
            let iqr = q3 - q1;
            OutlierBounds {
                q1,
                q3,
                iqr,
                lower: q1 - self.iqr_multiplier * iqr,
                upper: q3 + self.iqr_multiplier * iqr,
            }
        });

        let outliers = bounds.map_or(0, |b| {
            (&values.lt(b.lower) | &values.gt(b.upper)).num_trues()
        });

        Ok(CheckStatus::Evaluated(OutlierReport {
            field,
            bounds,
            outliers,
        }))
    }

    /// Compare each row's charge with the charge implied by the median rate.
    ///
    /// The implied rate of a row is `charge / (minutes + epsilon)`; the
    /// reference is the median over the same rows. A row is a violation when
    /// its charge deviates from `minutes * median_rate` by more than the
    /// tolerance, measured relative to the actual charge. Rows missing either
    /// value are skipped.
    pub fn check_rate_consistency(
        &self,
        df: &DataFrame,
        minutes_field: Field,
        charge_field: Field,
    ) -> Result<CheckStatus<RateConsistency>> {
        let (Some(minutes), Some(charges)) =
            (df.field_f64(minutes_field)?, df.field_f64(charge_field)?)
        else {
            return Ok(CheckStatus::NotEvaluated);
        };

        let rates = &charges / &(&minutes + self.rate_epsilon);
        let median_rate = median(&rates);

        let violations = median_rate.map_or(0, |rate| {
            minutes
                .into_iter()
                .zip(&charges)
                .filter_map(|(m, c)| Some((m?, c?)))
                .filter(|(m, c)| deviation_percent(*c, m * rate) > self.rate_tolerance_percent)
                .count()
        });

        Ok(CheckStatus::Evaluated(RateConsistency {
            minutes_field,
            charge_field,
            median_rate,
            rows_checked: rates.len() - rates.null_count(),
            violations,
        }))
    }

    /// Rate consistency for every usage category.
    pub fn check_all_rates(&self, df: &DataFrame) -> Result<Vec<CategoryRateCheck>> {
        UsageCategory::ALL
            .into_iter()
            .map(|category| {
                Ok(CategoryRateCheck {
                    category,
                    check: self.check_rate_consistency(
                        df,
                        category.minutes_field(),
                        category.charge_field(),
                    )?,
                })
            })
            .collect()
    }

    /// Missing cells per column, in column order.
    pub fn count_missing(&self, df: &DataFrame) -> MissingValues {
        let columns: Vec<ColumnMissing> = df
            .get_columns()
            .iter()
            .map(|column| ColumnMissing {
                column: column.name().to_string(),
                missing: column.null_count(),
            })
            .collect();
        let total = columns.iter().map(|c| c.missing).sum();
        MissingValues { columns, total }
    }

    /// Account length outside the expected range and service calls above the
    /// expected maximum.
    pub fn check_expected_ranges(&self, df: &DataFrame) -> Result<Vec<RangeCheck>> {
        let (min, max) = self.account_length_range;
        Ok(vec![
            self.range_check(df, Field::AccountLength, Some(min), Some(max))?,
            self.range_check(df, Field::ServiceCalls, None, Some(self.max_service_calls))?,
        ])
    }

    fn range_check(
        &self,
        df: &DataFrame,
        field: Field,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<RangeCheck> {
        let violations = match df.field_f64(field)? {
            Some(values) => {
                let mut outside = BooleanChunked::full("outside".into(), false, values.len());
                if let Some(lo) = min {
                    outside = &outside | &values.lt(lo);
                }
                if let Some(hi) = max {
                    outside = &outside | &values.gt(hi);
                }
                CheckStatus::Evaluated(outside.num_trues())
            }
            None => CheckStatus::NotEvaluated,
        };
        Ok(RangeCheck {
            field,
            min,
            max,
            violations,
        })
    }
}

/// Rewrite `-0.0` as `0.0` in every float column.
fn normalize_signed_zeros(df: &DataFrame) -> Result<DataFrame> {
    let mut normalized = df.clone();
    for column in df.get_columns() {
        let name = column.name().clone();
        let series = match column.dtype() {
            DataType::Float64 => column
                .f64()?
                .apply_values(|v| if v == 0.0 { 0.0 } else { v })
                .with_name(name)
                .into_series(),
            DataType::Float32 => column
                .f32()?
                .apply_values(|v| if v == 0.0 { 0.0 } else { v })
                .with_name(name)
                .into_series(),
            _ => continue,
        };
        normalized.with_column(series)?;
    }
    Ok(normalized)
}

/// Deviation of `actual` from `expected` in percent of `actual`.
///
/// A zero charge is consistent only with a zero expectation.
fn deviation_percent(actual: f64, expected: f64) -> f64 {
    if actual == 0.0 {
        if expected == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        ((actual - expected) / actual).abs() * 100.0
    }
}
