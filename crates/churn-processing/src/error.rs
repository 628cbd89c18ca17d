//! Custom error types for the churn processing pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Per-row data
//! problems are never errors: the validator reports them as counts. Errors
//! are reserved for things that stop a stage from running at all, such as an
//! unreadable file or a column whose type contradicts the schema.
//!
//! Errors are serializable so that callers embedding the pipeline can forward
//! them as structured `{ code, message }` payloads.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the churn processing pipeline.
#[derive(Error, Debug)]
pub enum ChurnError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A known column holds values that contradict its schema type.
    #[error("Column '{column}' expected {expected}, found {found}")]
    SchemaMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisting a report or table failed.
    #[error("Failed to write report: {0}")]
    ReportWriteFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ChurnError>,
    },
}

impl ChurnError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ChurnError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ReportWriteFailed(_) => "REPORT_WRITE_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by the shape of the input data rather
    /// than by the environment (filesystem, serialization).
    pub fn is_data_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::SchemaMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_data_error(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for ChurnError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ChurnError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ChurnError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ChurnError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for churn processing operations.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ChurnError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ChurnError::Io(e).with_context(context))
    }
}
