//! Shared helpers for ingestion and reporting.
//!
//! Data type checks on polars dtypes, lenient parsing of the text cells that
//! turn up in exported spreadsheets, and a couple of numeric formatting helpers.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 3] = [',', '$', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use churn_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
///
/// Empty and whitespace-only strings count as markers too.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles currency symbols and thousands separators. Non-finite results
/// (`inf`, `NaN`) are rejected.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Boolean Detection Utilities
// =============================================================================

/// Boolean true representations accepted for the churn label.
pub const BOOLEAN_TRUE_VALUES: [&str; 5] = ["true", "yes", "1", "t", "y"];

/// Boolean false representations accepted for the churn label.
pub const BOOLEAN_FALSE_VALUES: [&str; 5] = ["false", "no", "0", "f", "n"];

/// Parse a boolean-like string, `None` when it is neither true nor false.
pub fn parse_boolean_string(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_VALUES.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

// =============================================================================
// Numeric Helpers
// =============================================================================

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Render a number the way reports group and print it.
///
/// Integral values print without a fractional part (`415.0` as `"415"`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Percentage of `part` in `total`, 0.0 when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(415.0), "415");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_dtype_checks() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(is_integer_dtype(&DataType::UInt32));
        assert!(!is_integer_dtype(&DataType::Float32));
    }

    #[test]
    fn test_is_error_marker() {
        assert!(is_error_marker("ERROR"));
        assert!(is_error_marker("N/A"));
        assert!(is_error_marker("  MISSING  "));
        assert!(is_error_marker(""));
        assert!(!is_error_marker("42"));
        assert!(!is_error_marker("KS"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("hello"), None);
        assert_eq!(parse_numeric_string("inf"), None);
    }

    #[test]
    fn test_parse_boolean_string() {
        assert_eq!(parse_boolean_string("True"), Some(true));
        assert_eq!(parse_boolean_string(" no "), Some(false));
        assert_eq!(parse_boolean_string("1"), Some(true));
        assert_eq!(parse_boolean_string("maybe"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(14.4927, 2), 14.49);
        assert_eq!(round_to(0.125, 1), 0.1);
        assert_eq!(round_to(-2.555, 0), -3.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
