//! Typed schema for the telecom churn dataset.
//!
//! Every known column is an enumerated [`Field`] mapped to a semantic
//! [`FieldKind`] and a [`Constraint`]. The schema is checked once at
//! ingestion (see [`crate::ingest`]); downstream stages look fields up by
//! enum rather than by free-form column names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Geographic region (two-letter state code)
    Region,
    /// Yes/No subscription flag
    PlanFlag,
    /// Non-fractional count (calls, messages, days)
    Count,
    /// Usage duration in minutes
    Minutes,
    /// Billed amount
    Charge,
    /// Numeric code with no magnitude meaning
    Code,
    /// Binary churn outcome
    Target,
}

impl FieldKind {
    /// Whether values of this kind are stored as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Count | Self::Minutes | Self::Charge | Self::Code
        )
    }
}

/// Value constraint attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    NonNegative,
    Unconstrained,
}

/// Known columns of the churn dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "State")]
    State,
    #[serde(rename = "Account length")]
    AccountLength,
    #[serde(rename = "Area code")]
    AreaCode,
    #[serde(rename = "International plan")]
    InternationalPlan,
    #[serde(rename = "Voice mail plan")]
    VoiceMailPlan,
    #[serde(rename = "Number vmail messages")]
    VmailMessages,
    #[serde(rename = "Total day minutes")]
    DayMinutes,
    #[serde(rename = "Total day calls")]
    DayCalls,
    #[serde(rename = "Total day charge")]
    DayCharge,
    #[serde(rename = "Total eve minutes")]
    EveMinutes,
    #[serde(rename = "Total eve calls")]
    EveCalls,
    #[serde(rename = "Total eve charge")]
    EveCharge,
    #[serde(rename = "Total night minutes")]
    NightMinutes,
    #[serde(rename = "Total night calls")]
    NightCalls,
    #[serde(rename = "Total night charge")]
    NightCharge,
    #[serde(rename = "Total intl minutes")]
    IntlMinutes,
    #[serde(rename = "Total intl calls")]
    IntlCalls,
    #[serde(rename = "Total intl charge")]
    IntlCharge,
    #[serde(rename = "Customer service calls")]
    ServiceCalls,
    #[serde(rename = "Churn")]
    Churn,
}

impl Field {
    /// All known fields in canonical dataset order.
    pub const ALL: [Field; 20] = [
        Field::State,
        Field::AccountLength,
        Field::AreaCode,
        Field::InternationalPlan,
        Field::VoiceMailPlan,
        Field::VmailMessages,
        Field::DayMinutes,
        Field::DayCalls,
        Field::DayCharge,
        Field::EveMinutes,
        Field::EveCalls,
        Field::EveCharge,
        Field::NightMinutes,
        Field::NightCalls,
        Field::NightCharge,
        Field::IntlMinutes,
        Field::IntlCalls,
        Field::IntlCharge,
        Field::ServiceCalls,
        Field::Churn,
    ];

    /// Fields that must never hold negative values.
    pub const NON_NEGATIVE: [Field; 15] = [
        Field::AccountLength,
        Field::DayMinutes,
        Field::DayCalls,
        Field::DayCharge,
        Field::EveMinutes,
        Field::EveCalls,
        Field::EveCharge,
        Field::NightMinutes,
        Field::NightCalls,
        Field::NightCharge,
        Field::IntlMinutes,
        Field::IntlCalls,
        Field::IntlCharge,
        Field::ServiceCalls,
        Field::VmailMessages,
    ];

    /// The four per-period charge fields that make up customer revenue.
    pub const CHARGES: [Field; 4] = [
        Field::DayCharge,
        Field::EveCharge,
        Field::NightCharge,
        Field::IntlCharge,
    ];

    /// Column header as it appears in the source file.
    pub fn header(&self) -> &'static str {
        match self {
            Self::State => "State",
            Self::AccountLength => "Account length",
            Self::AreaCode => "Area code",
            Self::InternationalPlan => "International plan",
            Self::VoiceMailPlan => "Voice mail plan",
            Self::VmailMessages => "Number vmail messages",
            Self::DayMinutes => "Total day minutes",
            Self::DayCalls => "Total day calls",
            Self::DayCharge => "Total day charge",
            Self::EveMinutes => "Total eve minutes",
            Self::EveCalls => "Total eve calls",
            Self::EveCharge => "Total eve charge",
            Self::NightMinutes => "Total night minutes",
            Self::NightCalls => "Total night calls",
            Self::NightCharge => "Total night charge",
            Self::IntlMinutes => "Total intl minutes",
            Self::IntlCalls => "Total intl calls",
            Self::IntlCharge => "Total intl charge",
            Self::ServiceCalls => "Customer service calls",
            Self::Churn => "Churn",
        }
    }

    /// Resolve a column header to a known field.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    pub fn from_header(header: &str) -> Option<Field> {
        let wanted = header.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.header().eq_ignore_ascii_case(wanted))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::State => FieldKind::Region,
            Self::InternationalPlan | Self::VoiceMailPlan => FieldKind::PlanFlag,
            Self::AccountLength
            | Self::VmailMessages
            | Self::DayCalls
            | Self::EveCalls
            | Self::NightCalls
            | Self::IntlCalls
            | Self::ServiceCalls => FieldKind::Count,
            Self::DayMinutes | Self::EveMinutes | Self::NightMinutes | Self::IntlMinutes => {
                FieldKind::Minutes
            }
            Self::DayCharge | Self::EveCharge | Self::NightCharge | Self::IntlCharge => {
                FieldKind::Charge
            }
            Self::AreaCode => FieldKind::Code,
            Self::Churn => FieldKind::Target,
        }
    }

    pub fn constraint(&self) -> Constraint {
        if Self::NON_NEGATIVE.contains(self) {
            Constraint::NonNegative
        } else {
            Constraint::Unconstrained
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Billing period of a (minutes, charge) field pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    Day,
    Evening,
    Night,
    International,
}

impl UsageCategory {
    pub const ALL: [UsageCategory; 4] = [
        UsageCategory::Day,
        UsageCategory::Evening,
        UsageCategory::Night,
        UsageCategory::International,
    ];

    pub fn minutes_field(&self) -> Field {
        match self {
            Self::Day => Field::DayMinutes,
            Self::Evening => Field::EveMinutes,
            Self::Night => Field::NightMinutes,
            Self::International => Field::IntlMinutes,
        }
    }

    pub fn charge_field(&self) -> Field {
        match self {
            Self::Day => Field::DayCharge,
            Self::Evening => Field::EveCharge,
            Self::Night => Field::NightCharge,
            Self::International => Field::IntlCharge,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Evening => "evening",
            Self::Night => "night",
            Self::International => "international",
        }
    }
}

/// Outcome of matching a dataset's headers against the known fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Known fields found in the dataset, in column order
    pub recognized: Vec<Field>,
    /// Known fields absent from the dataset
    pub missing: Vec<Field>,
    /// Column headers that do not map to a known field
    pub extra: Vec<String>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip_for_every_field() {
        for field in Field::ALL {
            assert_eq!(Field::from_header(field.header()), Some(field));
        }
    }

    #[test]
    fn test_from_header_is_lenient_on_case_and_padding() {
        assert_eq!(
            Field::from_header("  total DAY minutes "),
            Some(Field::DayMinutes)
        );
        assert_eq!(Field::from_header("Phone number"), None);
    }

    #[test]
    fn test_non_negative_constraint() {
        assert_eq!(Field::DayCharge.constraint(), Constraint::NonNegative);
        assert_eq!(Field::VmailMessages.constraint(), Constraint::NonNegative);
        assert_eq!(Field::AreaCode.constraint(), Constraint::Unconstrained);
        assert_eq!(Field::State.constraint(), Constraint::Unconstrained);
    }

    #[test]
    fn test_numeric_kinds() {
        let numeric: Vec<Field> = Field::ALL.into_iter().filter(Field::is_numeric).collect();
        // 15 non-negative numerics plus area code
        assert_eq!(numeric.len(), 16);
        assert!(!Field::Churn.is_numeric());
        assert!(!Field::InternationalPlan.is_numeric());
    }

    #[test]
    fn test_usage_category_pairs() {
        for category in UsageCategory::ALL {
            assert_eq!(category.minutes_field().kind(), FieldKind::Minutes);
            assert_eq!(category.charge_field().kind(), FieldKind::Charge);
        }
    }

    #[test]
    fn test_field_serializes_as_header() {
        let json = serde_json::to_string(&Field::ServiceCalls).unwrap();
        assert_eq!(json, "\"Customer service calls\"");
        let parsed: Field = serde_json::from_str("\"Total intl charge\"").unwrap();
        assert_eq!(parsed, Field::IntlCharge);
    }
}
