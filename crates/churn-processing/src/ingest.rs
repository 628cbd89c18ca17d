//! Loading the churn dataset into a schema-checked polars frame.
//!
//! [`apply_schema`] checks every known column against its schema kind once:
//! recognized headers are renamed to their canonical [`Field::header`] and
//! cast to the dtype of their kind, so the validator and analysis stages can
//! rely on typed columns.

use crate::error::{ChurnError, Result, ResultExt};
use crate::frame::{FieldFrame, field_dtype};
use crate::schema::{Field, FieldKind};
use crate::utils::{
    is_error_marker, is_integer_dtype, is_numeric_dtype, parse_boolean_string,
    parse_numeric_string,
};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Load a CSV file with multiple fallback strategies.
///
/// Tries standard quoted parsing first, then unquoted parsing, and finally
/// reads the raw content, collapses doubled quotes and drops blank lines.
pub fn load_csv_with_fallbacks(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Could not read file: {}", e);
        ChurnError::Io(e).with_context(format!("Reading {}", path.display()))
    })?;
    let cursor = std::io::Cursor::new(clean_csv_content(&content));

    CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .into_reader_with_file_handle(cursor)
        .finish()
        .context(format!("Parsing {}", path.display()))
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load a CSV file and check it against the schema.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    info!("Loading dataset from: {}", path.display());
    let df = load_csv_with_fallbacks(path)?;
    info!("Dataset loaded: {:?}", df.shape());
    apply_schema(df)
}

/// Rename and cast every recognized column to its schema dtype.
///
/// Minutes and charges become `Float64`. Counts and codes become `Int64`
/// when the source column is an integer column or every value is integral,
/// and stay `Float64` otherwise so fractional values survive. `Churn`
/// becomes `Boolean` and text fields become `String`. Missing-value markers
/// turn into nulls; any other text in a numeric or boolean field is a
/// [`ChurnError::SchemaMismatch`]. Unknown columns pass through untouched.
pub fn apply_schema(df: DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let typed = match Field::from_header(column.name()) {
            Some(field) => conform_field(field, series)?,
            None => series.clone(),
        };
        columns.push(typed.into_column());
    }

    let df = DataFrame::new(columns).context("Applying schema")?;
    let report = df.schema_report();
    if !report.missing.is_empty() {
        debug!("Known fields absent from dataset: {:?}", report.missing);
    }
    Ok(df)
}

fn conform_field(field: Field, series: &Series) -> Result<Series> {
    let name: PlSmallStr = field.header().into();
    let kind = field.kind();

    if series.dtype() == &DataType::Null {
        return Ok(Series::full_null(name, series.len(), &field_dtype(kind)));
    }

    let typed = match kind {
        FieldKind::Minutes | FieldKind::Charge => float_values(field, series)?.into_series(),
        FieldKind::Count | FieldKind::Code => {
            let values = float_values(field, series)?;
            let integral = is_integer_dtype(series.dtype())
                || values.into_iter().flatten().all(|v| v.fract() == 0.0);
            if integral {
                values.into_series().cast(&DataType::Int64)?
            } else {
                debug!("{}: fractional values, kept as Float64", field);
                values.into_series()
            }
        }
        FieldKind::Target => flag_values(field, series)?.into_series(),
        FieldKind::Region | FieldKind::PlanFlag => series.cast(&DataType::String)?,
    };
    Ok(typed.with_name(name))
}

fn float_values(field: Field, series: &Series) -> Result<Float64Chunked> {
    if is_numeric_dtype(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|n| !n.is_nan()))
            .collect());
    }

    let text = series.cast(&DataType::String)?;
    text.str()?
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(raw) if is_error_marker(raw) => Ok(None),
            Some(raw) => parse_numeric_string(raw).map(Some).ok_or_else(|| {
                ChurnError::SchemaMismatch {
                    column: field.header().to_string(),
                    expected: "numeric".to_string(),
                    found: format!("text '{}'", raw),
                }
            }),
        })
        .collect()
}

fn flag_values(field: Field, series: &Series) -> Result<BooleanChunked> {
    let dtype = series.dtype();

    if dtype == &DataType::Boolean {
        return Ok(series.bool()?.clone());
    }

    if is_numeric_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|n| !n.is_nan()).map(|n| n != 0.0))
            .collect());
    }

    let text = series.cast(&DataType::String)?;
    text.str()?
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(raw) if is_error_marker(raw) => Ok(None),
            Some(raw) => parse_boolean_string(raw).map(Some).ok_or_else(|| {
                ChurnError::SchemaMismatch {
                    column: field.header().to_string(),
                    expected: "boolean".to_string(),
                    found: format!("text '{}'", raw),
                }
            }),
        })
        .collect()
}
