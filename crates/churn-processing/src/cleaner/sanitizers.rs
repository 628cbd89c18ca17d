//! Standardization of categorical text cells.

use crate::error::Result;
use crate::frame::FieldFrame;
use crate::schema::Field;
use crate::utils::is_error_marker;
use polars::prelude::*;
use tracing::debug;

/// Strip surrounding quotes and whitespace, repeatedly.
pub(crate) fn strip_quotes(value: &str) -> String {
    let mut cleaned = value.trim();

    // Bounded so malformed input cannot loop forever
    for _ in 0..10 {
        let inner = if cleaned.len() >= 2
            && ((cleaned.starts_with('"') && cleaned.ends_with('"'))
                || (cleaned.starts_with('\'') && cleaned.ends_with('\'')))
        {
            cleaned[1..cleaned.len() - 1].trim()
        } else {
            break;
        };
        cleaned = inner;
    }

    cleaned.to_string()
}

/// Upper-case the first character and lower-case the rest.
pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Rewrite every text cell of `field` with `normalize`.
///
/// Cells that become empty or are missing-value markers turn into nulls.
/// Returns the number of cells that changed.
fn normalize_text_field<F>(df: &mut DataFrame, field: Field, normalize: F) -> Result<usize>
where
    F: Fn(&str) -> String,
{
    let Some(values) = df.field_str(field)? else {
        return Ok(0);
    };

    let mut changed = 0;
    let normalized: StringChunked = values
        .into_iter()
        .map(|raw| {
            let raw = raw?;
            let cleaned = strip_quotes(raw);
            let next = (!is_error_marker(&cleaned)).then(|| normalize(&cleaned));
            if next.as_deref() != Some(raw) {
                changed += 1;
            }
            next
        })
        .collect();

    df.with_column(normalized.with_name(field.header().into()))?;
    Ok(changed)
}

/// Trim and upper-case two-letter state codes.
pub(crate) fn standardize_state(df: &mut DataFrame) -> Result<usize> {
    let changed = normalize_text_field(df, Field::State, |s| s.to_uppercase())?;
    debug!("Standardized {} state values", changed);
    Ok(changed)
}

/// Trim and capitalize plan flags (`" yes"` becomes `"Yes"`).
pub(crate) fn standardize_plan_flags(df: &mut DataFrame) -> Result<usize> {
    let mut changed = 0;
    for field in [Field::InternationalPlan, Field::VoiceMailPlan] {
        changed += normalize_text_field(df, field, capitalize)?;
    }
    debug!("Standardized {} plan flag values", changed);
    Ok(changed)
}
