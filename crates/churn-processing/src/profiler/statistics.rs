//! Descriptive statistics over polars `Float64` columns.
//!
//! Nulls are ignored and every function returns `None` when no value is
//! left, so callers never divide by zero on empty columns.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantile with linear interpolation between the closest ranks.
///
/// For `n` values the position is `q * (n - 1)` on the sorted values.
pub fn quantile(values: &Float64Chunked, q: f64) -> Result<Option<f64>> {
    Ok(values.quantile(q.clamp(0.0, 1.0), QuantileMethod::Linear)?)
}

/// First and third quartiles.
pub fn quartiles(values: &Float64Chunked) -> Result<Option<(f64, f64)>> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    Ok(q1.zip(q3))
}

pub fn median(values: &Float64Chunked) -> Option<f64> {
    values.median()
}

pub fn mean(values: &Float64Chunked) -> Option<f64> {
    values.mean()
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns `Some(0.0)` for a single value.
pub fn sample_std(values: &Float64Chunked) -> Option<f64> {
    match values.len() - values.null_count() {
        0 => None,
        1 => Some(0.0),
        _ => values.std(1),
    }
}

/// Pearson correlation of two equally long columns.
///
/// Rows where either side is null are skipped. Returns `None` when fewer
/// than two pairs remain or either side has zero variance.
pub fn pearson(xs: &Float64Chunked, ys: &Float64Chunked) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
    /// Coefficient of variation in percent, `None` when the mean is zero.
    pub cv_percent: Option<f64>,
}

impl NumericSummary {
    /// Summarize a column, `None` when it holds no values.
    pub fn from_values(values: &Float64Chunked) -> Result<Option<Self>> {
        let (Some(mean), Some(std), Some(min), Some(max)) = (
            mean(values),
            sample_std(values),
            values.min(),
            values.max(),
        ) else {
            return Ok(None);
        };
        let (Some(q25), Some(median), Some(q75)) = (
            quantile(values, 0.25)?,
            quantile(values, 0.5)?,
            quantile(values, 0.75)?,
        ) else {
            return Ok(None);
        };

        Ok(Some(Self {
            count: values.len() - values.null_count(),
            mean,
            std,
            min,
            q25,
            median,
            q75,
            max,
            cv_percent: (mean != 0.0).then(|| std / mean * 100.0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Float64Chunked {
        Float64Chunked::from_slice("values".into(), values)
    }

    // ==================== quantile tests ====================

    #[test]
    fn test_quartiles_linear_interpolation() {
        let values = column(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0]);
        let (q1, q3) = quartiles(&values).unwrap().unwrap();
        assert!((q1 - 3.25).abs() < 1e-12);
        assert!((q3 - 7.75).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_ignores_order_and_nulls() {
        let values = Float64Chunked::from_slice_options(
            "values".into(),
            &[Some(5.0), None, Some(1.0), Some(3.0)],
        );
        assert_eq!(median(&values), Some(3.0));
        assert_eq!(quantile(&values, 0.0).unwrap(), Some(1.0));
        assert_eq!(quantile(&values, 1.0).unwrap(), Some(5.0));
    }

    #[test]
    fn test_quantile_empty_is_none() {
        assert_eq!(quantile(&column(&[]), 0.5).unwrap(), None);
        let nulls = Float64Chunked::full_null("values".into(), 2);
        assert_eq!(quartiles(&nulls).unwrap(), None);
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median(&column(&[1.0, 2.0, 3.0, 4.0])), Some(2.5));
    }

    // ==================== mean / std tests ====================

    #[test]
    fn test_sample_std_basic() {
        // Variance = 10 / 4 = 2.5
        let std = sample_std(&column(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_single_value() {
        assert_eq!(sample_std(&column(&[5.0])), Some(0.0));
        assert_eq!(sample_std(&column(&[])), None);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&column(&[])), None);
        assert_eq!(mean(&column(&[2.0, 4.0])), Some(3.0));
    }

    // ==================== pearson tests ====================

    #[test]
    fn test_pearson_perfect_correlation() {
        let r = pearson(&column(&[1.0, 2.0, 3.0]), &column(&[2.0, 4.0, 6.0])).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&column(&[1.0, 2.0, 3.0]), &column(&[3.0, 2.0, 1.0])).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_skips_null_pairs() {
        let xs = Float64Chunked::from_slice_options(
            "x".into(),
            &[Some(1.0), None, Some(2.0), Some(3.0)],
        );
        let ys = column(&[2.0, 100.0, 4.0, 6.0]);
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance() {
        assert_eq!(pearson(&column(&[1.0, 1.0, 1.0]), &column(&[1.0, 2.0, 3.0])), None);
        assert_eq!(pearson(&column(&[1.0]), &column(&[1.0])), None);
    }

    // ==================== NumericSummary tests ====================

    #[test]
    fn test_numeric_summary() {
        let summary = NumericSummary::from_values(&column(&[10.0, 20.0, 30.0, 40.0, 50.0]))
            .unwrap()
            .unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.mean, 30.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.q25, 20.0);
        assert_eq!(summary.median, 30.0);
        assert_eq!(summary.q75, 40.0);
        assert_eq!(summary.max, 50.0);
        let cv = summary.cv_percent.unwrap();
        assert!((cv - summary.std / 30.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_summary_zero_mean_has_no_cv() {
        let summary = NumericSummary::from_values(&column(&[-1.0, 1.0]))
            .unwrap()
            .unwrap();
        assert_eq!(summary.cv_percent, None);
        assert!(NumericSummary::from_values(&column(&[])).unwrap().is_none());
    }
}
