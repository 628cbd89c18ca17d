//! Property-based tests for the data-quality validator.
//!
//! Random usage tables are generated and run through the validator to check
//! the guarantees each operation makes regardless of input.

use churn_processing::frame::numeric_frame;
use churn_processing::{DataQualityValidator, Field, FieldFrame};
use polars::prelude::DataFrame;
use proptest::prelude::*;

const USAGE_FIELDS: [Field; 3] = [Field::DayMinutes, Field::DayCharge, Field::ServiceCalls];

type Row = Vec<Option<f64>>;

// =============================================================================
// Test Strategies
// =============================================================================

/// A usage cell: mostly plausible values, sometimes negative or missing.
fn usage_cell() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        8 => (0u32..400).prop_map(|v| Some(f64::from(v))),
        1 => (1u32..50).prop_map(|v| Some(-f64::from(v))),
        1 => Just(None),
    ]
}

/// Rows of day minutes, day charge and service calls. Small value ranges
/// make duplicate rows likely.
fn usage_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(prop::collection::vec(usage_cell(), 3), 0..40)
}

fn usage_frame(rows: &[Row]) -> DataFrame {
    let columns: Vec<Row> = (0..USAGE_FIELDS.len())
        .map(|i| rows.iter().map(|row| row[i]).collect())
        .collect();
    numeric_frame(&[
        (USAGE_FIELDS[0], columns[0].as_slice()),
        (USAGE_FIELDS[1], columns[1].as_slice()),
        (USAGE_FIELDS[2], columns[2].as_slice()),
    ])
    .unwrap()
}

/// Rows of a usage frame, read back through the typed accessors.
fn frame_rows(df: &DataFrame) -> Vec<Row> {
    let columns: Vec<Row> = USAGE_FIELDS
        .iter()
        .map(|field| df.field_f64(*field).unwrap().unwrap().into_iter().collect())
        .collect();
    (0..df.height())
        .map(|i| columns.iter().map(|column| column[i]).collect())
        .collect()
}

fn finite_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1000.0f64..1000.0, 0..60)
}

// =============================================================================
// Deduplication
// =============================================================================

proptest! {
    #[test]
    fn deduplicate_is_idempotent(rows in usage_rows()) {
        let validator = DataQualityValidator::default();

        let once = validator.deduplicate(&usage_frame(&rows)).unwrap();
        let twice = validator.deduplicate(&once.frame).unwrap();

        prop_assert_eq!(twice.removed, 0);
        prop_assert_eq!(frame_rows(&twice.frame), frame_rows(&once.frame));
    }

    #[test]
    fn deduplicate_keeps_first_of_each_distinct_row(rows in usage_rows()) {
        let validator = DataQualityValidator::default();

        let dedup = validator.deduplicate(&usage_frame(&rows)).unwrap();

        let mut expected: Vec<Row> = Vec::new();
        for row in &rows {
            if !expected.contains(row) {
                expected.push(row.clone());
            }
        }
        prop_assert_eq!(dedup.removed, rows.len() - expected.len());
        prop_assert_eq!(frame_rows(&dedup.frame), expected);
    }
}

// =============================================================================
// Negative Values
// =============================================================================

proptest! {
    #[test]
    fn reject_negative_leaves_no_negatives(rows in usage_rows()) {
        let validator = DataQualityValidator::default();

        let filtered = validator.reject_negative(&usage_frame(&rows), &USAGE_FIELDS).unwrap();

        let expected: Vec<Row> = rows
            .iter()
            .filter(|row| !row.iter().any(|cell| cell.is_some_and(|v| v < 0.0)))
            .cloned()
            .collect();
        prop_assert_eq!(frame_rows(&filtered.frame), expected.clone());
        prop_assert_eq!(filtered.summary.rows_removed, rows.len() - expected.len());

        let negative_cells = rows
            .iter()
            .flatten()
            .filter(|cell| cell.is_some_and(|v| v < 0.0))
            .count();
        prop_assert_eq!(filtered.summary.total_violations(), negative_cells);
    }

    #[test]
    fn reject_negative_ignores_absent_fields(rows in usage_rows()) {
        let validator = DataQualityValidator::default();

        let filtered = validator
            .reject_negative(&usage_frame(&rows), &[Field::IntlMinutes])
            .unwrap();

        prop_assert_eq!(filtered.frame.height(), rows.len());
        prop_assert!(!filtered.summary.fields[0].violations.is_evaluated());
    }
}

// =============================================================================
// Outliers and Rates
// =============================================================================

proptest! {
    #[test]
    fn outlier_detection_never_filters(values in finite_values()) {
        let validator = DataQualityValidator::default();
        let cells: Row = values.iter().copied().map(Some).collect();
        let df = numeric_frame(&[(Field::DayMinutes, cells.as_slice())]).unwrap();

        let report = validator.detect_extreme_outliers(&df, Field::DayMinutes).unwrap();

        let report = report.evaluated().unwrap();
        prop_assert!(report.outliers <= values.len());
        prop_assert_eq!(df.height(), values.len());
        prop_assert_eq!(report.bounds.is_none(), values.is_empty());
        if let Some(bounds) = &report.bounds {
            prop_assert!(bounds.lower <= bounds.q1);
            prop_assert!(bounds.q1 <= bounds.q3);
            prop_assert!(bounds.q3 <= bounds.upper);
        }
    }

    #[test]
    fn proportional_charges_are_consistent(
        minutes in prop::collection::vec(1u32..400, 1..40),
        rate in 0.01f64..1.0,
    ) {
        let validator = DataQualityValidator::default();
        let minutes: Row = minutes.into_iter().map(|m| Some(f64::from(m))).collect();
        let charges: Row = minutes.iter().map(|m| m.map(|m| m * rate)).collect();
        let df = numeric_frame(&[
            (Field::DayMinutes, minutes.as_slice()),
            (Field::DayCharge, charges.as_slice()),
        ])
        .unwrap();

        let check = validator
            .check_rate_consistency(&df, Field::DayMinutes, Field::DayCharge)
            .unwrap();

        let result = check.evaluated().unwrap();
        prop_assert_eq!(result.rows_checked, minutes.len());
        prop_assert_eq!(result.violations, 0);
    }
}
