//! Configuration types for the churn processing pipeline.
//!
//! A single [`PipelineConfig`] is built once and passed explicitly to every
//! stage. It is serializable so that it can be loaded from a JSON file.

use crate::schema::Field;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the churn processing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use churn_processing::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .outlier_iqr_multiplier(3.0)
///     .rate_tolerance_percent(5.0)
///     .save_to_disk(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Multiplier applied to the IQR when computing outlier bounds.
    /// 3.0 flags only extreme outliers; moderate extremes are kept as signal.
    /// Default: 3.0
    pub outlier_iqr_multiplier: f64,

    /// Added to minutes before dividing, so zero-minute rows yield a rate.
    /// Default: 0.01
    pub rate_epsilon: f64,

    /// Maximum tolerated deviation (in percent) between the actual charge and
    /// the charge implied by the median rate.
    /// Default: 5.0
    pub rate_tolerance_percent: f64,

    /// Fields whose negative values cause the whole row to be dropped.
    /// Default: [`Field::NON_NEGATIVE`]
    pub non_negative_fields: Vec<Field>,

    /// Lowest expected account length in days.
    /// Default: 1
    pub account_length_min: f64,

    /// Highest expected account length in days.
    /// Default: 300
    pub account_length_max: f64,

    /// Customer service calls above this count are reported.
    /// Default: 10
    pub max_service_calls: u32,

    /// Service-call count from which a customer is a "frequent caller".
    /// Used for the high-risk segment and the service call insight.
    /// Default: 4
    pub high_service_calls: u32,

    /// Service-call count from which a customer is at least medium risk.
    /// Default: 3
    pub medium_risk_service_calls: u32,

    /// Minimum customers for a state to enter the top-churn ranking.
    /// Default: 10
    pub min_state_customers: usize,

    /// Whether to normalize state codes and plan flags before validation.
    /// Default: true
    pub standardize_categoricals: bool,

    /// Root directory for written datasets and metric files.
    /// Default: "."
    pub output_dir: PathBuf,

    /// Whether to write stage outputs to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,

    /// Decimal places used when printing summaries.
    /// Default: 2
    pub display_precision: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outlier_iqr_multiplier: 3.0,
            rate_epsilon: 0.01,
            rate_tolerance_percent: 5.0,
            non_negative_fields: Field::NON_NEGATIVE.to_vec(),
            account_length_min: 1.0,
            account_length_max: 300.0,
            max_service_calls: 10,
            high_service_calls: 4,
            medium_risk_service_calls: 3,
            min_state_customers: 10,
            standardize_categoricals: true,
            output_dir: PathBuf::from("."),
            save_to_disk: true,
            display_precision: 2,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file and validate it.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.outlier_iqr_multiplier.is_finite() && self.outlier_iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "outlier_iqr_multiplier".to_string(),
                value: self.outlier_iqr_multiplier,
            });
        }

        if !(self.rate_epsilon.is_finite() && self.rate_epsilon > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "rate_epsilon".to_string(),
                value: self.rate_epsilon,
            });
        }

        if !(self.rate_tolerance_percent.is_finite() && self.rate_tolerance_percent >= 0.0) {
            return Err(ConfigValidationError::NegativeTolerance(
                self.rate_tolerance_percent,
            ));
        }

        if self.account_length_min > self.account_length_max {
            return Err(ConfigValidationError::InvalidRange {
                field: "account_length".to_string(),
                min: self.account_length_min,
                max: self.account_length_max,
            });
        }

        if self.medium_risk_service_calls > self.high_service_calls {
            return Err(ConfigValidationError::InvalidRange {
                field: "service_calls".to_string(),
                min: f64::from(self.medium_risk_service_calls),
                max: f64::from(self.high_service_calls),
            });
        }

        if let Some(field) = self.non_negative_fields.iter().find(|f| !f.is_numeric()) {
            return Err(ConfigValidationError::NotNumeric(*field));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be a positive number)")]
    NonPositive { field: String, value: f64 },

    #[error("Invalid rate tolerance: {0} (must be at least 0)")]
    NegativeTolerance(f64),

    #[error("Invalid range for '{field}': min {min} is greater than max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },

    #[error("Field '{0}' is not numeric and cannot carry a non-negative constraint")]
    NotNumeric(Field),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    outlier_iqr_multiplier: Option<f64>,
    rate_epsilon: Option<f64>,
    rate_tolerance_percent: Option<f64>,
    non_negative_fields: Option<Vec<Field>>,
    account_length_range: Option<(f64, f64)>,
    max_service_calls: Option<u32>,
    high_service_calls: Option<u32>,
    medium_risk_service_calls: Option<u32>,
    min_state_customers: Option<usize>,
    standardize_categoricals: Option<bool>,
    output_dir: Option<PathBuf>,
    save_to_disk: Option<bool>,
    display_precision: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration instead of the defaults.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            outlier_iqr_multiplier: Some(config.outlier_iqr_multiplier),
            rate_epsilon: Some(config.rate_epsilon),
            rate_tolerance_percent: Some(config.rate_tolerance_percent),
            non_negative_fields: Some(config.non_negative_fields),
            account_length_range: Some((config.account_length_min, config.account_length_max)),
            max_service_calls: Some(config.max_service_calls),
            high_service_calls: Some(config.high_service_calls),
            medium_risk_service_calls: Some(config.medium_risk_service_calls),
            min_state_customers: Some(config.min_state_customers),
            standardize_categoricals: Some(config.standardize_categoricals),
            output_dir: Some(config.output_dir),
            save_to_disk: Some(config.save_to_disk),
            display_precision: Some(config.display_precision),
        }
    }

    /// Set the IQR multiplier used for outlier bounds.
    pub fn outlier_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the epsilon added to minutes in the implied-rate division.
    pub fn rate_epsilon(mut self, epsilon: f64) -> Self {
        self.rate_epsilon = Some(epsilon);
        self
    }

    /// Set the tolerated charge deviation in percent.
    pub fn rate_tolerance_percent(mut self, tolerance: f64) -> Self {
        self.rate_tolerance_percent = Some(tolerance);
        self
    }

    /// Replace the list of fields that must be non-negative.
    pub fn non_negative_fields(mut self, fields: impl Into<Vec<Field>>) -> Self {
        self.non_negative_fields = Some(fields.into());
        self
    }

    /// Set the expected account length range, inclusive on both ends.
    pub fn account_length_range(mut self, min: f64, max: f64) -> Self {
        self.account_length_range = Some((min, max));
        self
    }

    pub fn max_service_calls(mut self, calls: u32) -> Self {
        self.max_service_calls = Some(calls);
        self
    }

    pub fn high_service_calls(mut self, calls: u32) -> Self {
        self.high_service_calls = Some(calls);
        self
    }

    pub fn medium_risk_service_calls(mut self, calls: u32) -> Self {
        self.medium_risk_service_calls = Some(calls);
        self
    }

    pub fn min_state_customers(mut self, customers: usize) -> Self {
        self.min_state_customers = Some(customers);
        self
    }

    /// Enable or disable categorical standardization.
    pub fn standardize_categoricals(mut self, enable: bool) -> Self {
        self.standardize_categoricals = Some(enable);
        self
    }

    /// Set the output directory for datasets and metric files.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Enable or disable writing outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    pub fn display_precision(mut self, digits: usize) -> Self {
        self.display_precision = Some(digits);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let (account_length_min, account_length_max) = self
            .account_length_range
            .unwrap_or((defaults.account_length_min, defaults.account_length_max));

        let config = PipelineConfig {
            outlier_iqr_multiplier: self
                .outlier_iqr_multiplier
                .unwrap_or(defaults.outlier_iqr_multiplier),
            rate_epsilon: self.rate_epsilon.unwrap_or(defaults.rate_epsilon),
            rate_tolerance_percent: self
                .rate_tolerance_percent
                .unwrap_or(defaults.rate_tolerance_percent),
            non_negative_fields: self
                .non_negative_fields
                .unwrap_or(defaults.non_negative_fields),
            account_length_min,
            account_length_max,
            max_service_calls: self.max_service_calls.unwrap_or(defaults.max_service_calls),
            high_service_calls: self
                .high_service_calls
                .unwrap_or(defaults.high_service_calls),
            medium_risk_service_calls: self
                .medium_risk_service_calls
                .unwrap_or(defaults.medium_risk_service_calls),
            min_state_customers: self
                .min_state_customers
                .unwrap_or(defaults.min_state_customers),
            standardize_categoricals: self
                .standardize_categoricals
                .unwrap_or(defaults.standardize_categoricals),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            display_precision: self.display_precision.unwrap_or(defaults.display_precision),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.outlier_iqr_multiplier, 3.0);
        assert_eq!(config.rate_epsilon, 0.01);
        assert_eq!(config.rate_tolerance_percent, 5.0);
        assert_eq!(config.non_negative_fields.len(), 15);
        assert_eq!(config.max_service_calls, 10);
        assert!(config.standardize_categoricals);
        assert!(config.save_to_disk);
    }

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.outlier_iqr_multiplier, 3.0);
        assert_eq!(config.account_length_min, 1.0);
        assert_eq!(config.account_length_max, 300.0);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .outlier_iqr_multiplier(1.5)
            .rate_tolerance_percent(2.5)
            .non_negative_fields(vec![Field::DayMinutes])
            .account_length_range(0.0, 250.0)
            .save_to_disk(false)
            .build()
            .unwrap();

        assert_eq!(config.outlier_iqr_multiplier, 1.5);
        assert_eq!(config.rate_tolerance_percent, 2.5);
        assert_eq!(config.non_negative_fields, vec![Field::DayMinutes]);
        assert_eq!(config.account_length_max, 250.0);
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_validation_rejects_zero_multiplier() {
        let result = PipelineConfig::builder().outlier_iqr_multiplier(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NonPositive { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let result = PipelineConfig::builder()
            .account_length_range(300.0, 1.0)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidRange { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_text_field_constraint() {
        let result = PipelineConfig::builder()
            .non_negative_fields(vec![Field::State])
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NotNumeric(Field::State)
        ));
    }

    #[test]
    fn test_from_config_preserves_values() {
        let base = PipelineConfig::builder()
            .rate_epsilon(0.5)
            .min_state_customers(3)
            .build()
            .unwrap();
        let rebuilt = PipelineConfigBuilder::from_config(base)
            .save_to_disk(false)
            .build()
            .unwrap();
        assert_eq!(rebuilt.rate_epsilon, 0.5);
        assert_eq!(rebuilt.min_state_customers, 3);
        assert!(!rebuilt.save_to_disk);
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "outlier_iqr_multiplier": 1.5,
            "non_negative_fields": ["Total day minutes", "Customer service calls"],
            "output_dir": "custom_output",
            "save_to_disk": false
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.outlier_iqr_multiplier, 1.5);
        assert_eq!(
            config.non_negative_fields,
            vec![Field::DayMinutes, Field::ServiceCalls]
        );
        assert_eq!(config.output_dir.to_str().unwrap(), "custom_output");
        assert!(!config.save_to_disk);
        // Unspecified keys keep their defaults
        assert_eq!(config.rate_epsilon, 0.01);
        assert!(config.validate().is_ok());
    }
}
