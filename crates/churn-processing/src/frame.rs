//! Typed field access on the churn [`DataFrame`].
//!
//! Ingestion renames every recognized column to its canonical
//! [`Field::header`] and casts it to the dtype of its [`FieldKind`]
//! (see [`crate::ingest::apply_schema`]). Downstream stages look columns up
//! through [`FieldFrame`] by enum, never by free-form name.

use crate::error::Result;
use crate::schema::{Field, FieldKind, SchemaReport};
use crate::utils::format_number;
use polars::prelude::*;

/// Field lookups on a schema-checked frame.
///
/// Every accessor returns `Ok(None)` when the field is absent.
pub trait FieldFrame {
    /// Column holding `field`, looked up by its canonical header.
    fn field_column(&self, field: Field) -> Option<&Column>;

    fn has_field(&self, field: Field) -> bool {
        self.field_column(field).is_some()
    }

    /// Values of a field as `f64`, nulls where a cell is missing.
    fn field_f64(&self, field: Field) -> Result<Option<Float64Chunked>> {
        let Some(column) = self.field_column(field) else {
            return Ok(None);
        };
        let cast = column.cast(&DataType::Float64)?;
        Ok(Some(cast.f64()?.clone()))
    }

    fn field_bool(&self, field: Field) -> Result<Option<BooleanChunked>> {
        let Some(column) = self.field_column(field) else {
            return Ok(None);
        };
        let cast = column.cast(&DataType::Boolean)?;
        Ok(Some(cast.bool()?.clone()))
    }

    fn field_str(&self, field: Field) -> Result<Option<StringChunked>> {
        let Some(column) = self.field_column(field) else {
            return Ok(None);
        };
        let cast = column.cast(&DataType::String)?;
        Ok(Some(cast.str()?.clone()))
    }

    /// Present values of a numeric field, missing cells dropped.
    fn present_f64(&self, field: Field) -> Result<Option<Vec<f64>>> {
        Ok(self
            .field_f64(field)?
            .map(|values| values.into_iter().flatten().collect()))
    }

    /// Match the frame's headers against the known fields.
    fn schema_report(&self) -> SchemaReport;
}

impl FieldFrame for DataFrame {
    fn field_column(&self, field: Field) -> Option<&Column> {
        self.column(field.header()).ok()
    }

    fn schema_report(&self) -> SchemaReport {
        let mut report = SchemaReport::default();
        for name in self.get_column_names() {
            match Field::from_header(name) {
                Some(field) => report.recognized.push(field),
                None => report.extra.push(name.to_string()),
            }
        }
        report.missing = Field::ALL
            .into_iter()
            .filter(|field| !report.recognized.contains(field))
            .collect();
        report
    }
}

/// Storage dtype a field is cast to at ingestion.
///
/// Count and code fields keep integer storage only when every value is
/// integral, so this is the float fallback for them.
pub fn field_dtype(kind: FieldKind) -> DataType {
    match kind {
        FieldKind::Minutes | FieldKind::Charge | FieldKind::Count | FieldKind::Code => {
            DataType::Float64
        }
        FieldKind::Target => DataType::Boolean,
        FieldKind::Region | FieldKind::PlanFlag => DataType::String,
    }
}

/// Cells rendered the way reports group and print them, `None` for nulls.
///
/// Integral floats print without a fraction and flags as `True`/`False`.
pub fn display_values(series: &Series) -> Result<Vec<Option<String>>> {
    let values = match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let cast = series.cast(&DataType::Float64)?;
            cast.f64()?.into_iter().map(|v| v.map(format_number)).collect()
        }
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect(),
        _ => {
            let cast = series.cast(&DataType::String)?;
            cast.str()?.into_iter().map(|v| v.map(str::to_string)).collect()
        }
    };
    Ok(values)
}

/// Build a frame of numeric fields, `None` entries becoming nulls.
///
/// Columns may differ in length; shorter ones are padded with nulls.
pub fn numeric_frame(columns: &[(Field, &[Option<f64>])]) -> Result<DataFrame> {
    let height = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let columns = columns
        .iter()
        .map(|(field, values)| {
            let padded: Float64Chunked = (0..height)
                .map(|i| values.get(i).copied().flatten())
                .collect();
            padded.with_name(field.header().into()).into_column()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}
