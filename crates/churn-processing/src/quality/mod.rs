//! Data quality validation.
//!
//! [`DataQualityValidator`] holds the rule-based checks run during cleaning:
//! duplicate removal, negative-value filtering, extreme-outlier detection and
//! charge/minutes rate consistency, plus missing-value and expected-range
//! counts. Results are plain serializable values; the validator itself never
//! logs or touches the filesystem.

mod checks;
mod validator;

pub use checks::{
    CategoryRateCheck, CheckStatus, ColumnMissing, Deduplication, FieldViolations,
    MissingValues, NegativeFilter, NegativeSummary, OutlierBounds, OutlierReport, RangeCheck,
    RateConsistency,
};
pub use validator::DataQualityValidator;
