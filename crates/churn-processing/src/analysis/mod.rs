//! Exploratory churn analysis.
//!
//! [`ExploratoryAnalysis`] runs on the cleaned frame and produces an
//! [`EdaReport`]: descriptive statistics, categorical distributions, churn
//! breakdowns, correlations with churn, churner vs retained comparison, risk
//! segmentation and state-level churn. Every figure is computed from typed
//! fields; nothing is printed or written here.

mod segments;

pub use segments::{
    ChurnBreakdown, RiskSegment, RiskThresholds, assign_risk_segments, churn_by_column,
    churn_by_field, churn_labels, churn_rate_where,
};
pub(crate) use segments::{churn_by_tag, plan_flags, service_calls};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::frame::FieldFrame;
use crate::profiler::statistics::{NumericSummary, mean, pearson};
use crate::profiler::{ValueCount, value_counts};
use crate::schema::Field;
use crate::utils::percentage;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Absolute correlation above which a field is called out.
const NOTABLE_CORRELATION: f64 = 0.1;

/// Number of states in the ranked state lists.
const TOP_STATE_COUNT: usize = 10;

/// Number of largest churner/retained differences reported.
const TOP_DIFFERENCES: usize = 5;

/// Fields compared between churners and retained customers.
const COMPARISON_FIELDS: [Field; 8] = [
    Field::AccountLength,
    Field::DayMinutes,
    Field::EveMinutes,
    Field::NightMinutes,
    Field::IntlMinutes,
    Field::ServiceCalls,
    Field::DayCharge,
    Field::VmailMessages,
];

/// Descriptive statistics of one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub field: Field,
    #[serde(flatten)]
    pub summary: NumericSummary,
}

/// Share of one categorical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueShare {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Value distribution of a categorical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub field: Field,
    pub values: Vec<ValueShare>,
}

/// Pearson correlation of a numeric field with the churn label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnCorrelation {
    pub field: Field,
    pub correlation: f64,
    /// `|correlation| > 0.1`
    pub notable: bool,
}

/// Mean of a field among churners and retained customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupComparison {
    pub field: Field,
    pub churners_mean: f64,
    pub retained_mean: f64,
    pub difference: f64,
    /// Difference relative to the retained mean, `None` when that mean is zero.
    pub difference_percent: Option<f64>,
}

/// Churn rate on either side of the frequent-caller threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCallSplit {
    pub threshold: u32,
    pub at_or_above_rate_percent: Option<f64>,
    pub below_rate_percent: Option<f64>,
}

impl ServiceCallSplit {
    /// Percentage-point gap between frequent and infrequent callers.
    pub fn gap(&self) -> Option<f64> {
        Some(self.at_or_above_rate_percent? - self.below_rate_percent?)
    }
}

/// Churn breakdown per risk segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub segment: RiskSegment,
    pub churners: usize,
    pub total: usize,
    pub churn_rate_percent: f64,
}

/// Dataset-wide headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralMetrics {
    pub total_customers: usize,
    pub total_churners: usize,
    pub churn_rate_percent: f64,
    pub international_plan_customers: usize,
    pub voice_mail_customers: usize,
    pub mean_service_calls: Option<f64>,
    pub mean_day_minutes: Option<f64>,
    pub mean_day_charge: Option<f64>,
}

/// Churn rate with and without a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInsight {
    pub field: Field,
    pub with_plan_rate_percent: Option<f64>,
    pub without_plan_rate_percent: Option<f64>,
}

impl PlanInsight {
    /// Percentage-point gap between plan holders and the rest.
    pub fn gap(&self) -> Option<f64> {
        Some(self.with_plan_rate_percent? - self.without_plan_rate_percent?)
    }
}

/// Result of the exploratory analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaReport {
    pub numeric_statistics: Vec<FieldStatistics>,
    pub distributions: Vec<CategoryDistribution>,
    pub top_states: Vec<ValueCount>,
    pub churn_by_international_plan: Vec<ChurnBreakdown>,
    pub churn_by_voice_mail_plan: Vec<ChurnBreakdown>,
    pub churn_by_service_calls: Vec<ChurnBreakdown>,
    pub service_call_split: ServiceCallSplit,
    /// Sorted by correlation, highest first
    pub correlations: Vec<ChurnCorrelation>,
    pub churner_comparison: Vec<GroupComparison>,
    /// Fields with the largest absolute relative difference
    pub largest_differences: Vec<Field>,
    pub risk_segments: Vec<RiskBreakdown>,
    /// Every state, sorted by churn rate, highest first
    pub churn_by_state: Vec<ChurnBreakdown>,
    /// Highest churn rates among states with enough customers
    pub top_churn_states: Vec<ChurnBreakdown>,
    pub general_metrics: GeneralMetrics,
    pub plan_insights: Vec<PlanInsight>,
}

/// Exploratory churn analysis over the cleaned frame.
pub struct ExploratoryAnalysis {
    thresholds: RiskThresholds,
    high_service_calls: u32,
    min_state_customers: usize,
}

impl ExploratoryAnalysis {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            thresholds: risk_thresholds(config),
            high_service_calls: config.high_service_calls,
            min_state_customers: config.min_state_customers,
        }
    }

    /// Run the analysis. Fails with `ColumnNotFound` when `Churn` is absent.
    pub fn analyze(&self, df: &DataFrame) -> Result<EdaReport> {
        let labels = churn_labels(df)?;
        info!("Running exploratory analysis on {} rows", df.height());

        let numeric_statistics = Self::numeric_statistics(df)?;
        debug!("Computed statistics for {} numeric fields", numeric_statistics.len());

        let mut distributions = Vec::new();
        for field in [Field::InternationalPlan, Field::VoiceMailPlan] {
            if let Some(distribution) = Self::distribution(df, field)? {
                distributions.push(distribution);
            }
        }

        let top_states = match df.field_column(Field::State) {
            Some(column) => {
                let mut counts = value_counts(column)?;
                counts.truncate(TOP_STATE_COUNT);
                counts
            }
            None => Vec::new(),
        };

        let churn_by_international_plan = churn_by_field(df, Field::InternationalPlan)?;
        let churn_by_voice_mail_plan = churn_by_field(df, Field::VoiceMailPlan)?;
        let churn_by_service_calls = churn_by_field(df, Field::ServiceCalls)?;
        let service_call_split = self.service_call_split(df, &labels)?;

        let correlations = Self::correlations(df, &labels)?;
        let churner_comparison = Self::churner_comparison(df, &labels)?;
        let largest_differences = Self::largest_differences(&churner_comparison);

        let risk_segments = self.risk_breakdown(df, &labels)?;
        let churn_by_state = Self::churn_by_state(df)?;
        let mut top_churn_states: Vec<ChurnBreakdown> = churn_by_state
            .iter()
            .filter(|s| s.total >= self.min_state_customers)
            .cloned()
            .collect();
        top_churn_states.truncate(TOP_STATE_COUNT);

        let general_metrics = Self::general_metrics(df, &labels)?;
        let plan_insights = Self::plan_insights(df, &labels)?;

        info!(
            "Exploratory analysis complete: churn rate {:.2}%",
            general_metrics.churn_rate_percent
        );

        Ok(EdaReport {
            numeric_statistics,
            distributions,
            top_states,
            churn_by_international_plan,
            churn_by_voice_mail_plan,
            churn_by_service_calls,
            service_call_split,
            correlations,
            churner_comparison,
            largest_differences,
            risk_segments,
            churn_by_state,
            top_churn_states,
            general_metrics,
            plan_insights,
        })
    }

    fn numeric_statistics(df: &DataFrame) -> Result<Vec<FieldStatistics>> {
        let mut statistics = Vec::new();
        for field in Field::ALL.into_iter().filter(Field::is_numeric) {
            let Some(values) = df.field_f64(field)? else {
                continue;
            };
            if let Some(summary) = NumericSummary::from_values(&values)? {
                statistics.push(FieldStatistics { field, summary });
            }
        }
        Ok(statistics)
    }

    fn distribution(df: &DataFrame, field: Field) -> Result<Option<CategoryDistribution>> {
        let Some(column) = df.field_column(field) else {
            return Ok(None);
        };
        let counts = value_counts(column)?;
        let total: usize = counts.iter().map(|c| c.count).sum();
        Ok(Some(CategoryDistribution {
            field,
            values: counts
                .into_iter()
                .map(|c| ValueShare {
                    percent: percentage(c.count, total),
                    value: c.value,
                    count: c.count,
                })
                .collect(),
        }))
    }

    fn service_call_split(
        &self,
        df: &DataFrame,
        labels: &BooleanChunked,
    ) -> Result<ServiceCallSplit> {
        let calls = service_calls(df)?;
        let threshold = f64::from(self.high_service_calls);

        Ok(ServiceCallSplit {
            threshold: self.high_service_calls,
            at_or_above_rate_percent: churn_rate_where(labels, &calls.gt_eq(threshold))?,
            below_rate_percent: churn_rate_where(labels, &calls.lt(threshold))?,
        })
    }

    fn correlations(df: &DataFrame, labels: &BooleanChunked) -> Result<Vec<ChurnCorrelation>> {
        let target = labels.clone().into_series().cast(&DataType::Float64)?;
        let target = target.f64()?;

        let mut correlations = Vec::new();
        for field in Field::NON_NEGATIVE {
            let Some(values) = df.field_f64(field)? else {
                continue;
            };
            if let Some(correlation) = pearson(&values, target) {
                correlations.push(ChurnCorrelation {
                    field,
                    correlation,
                    notable: correlation.abs() > NOTABLE_CORRELATION,
                });
            }
        }

        correlations.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
        Ok(correlations)
    }

    fn churner_comparison(
        df: &DataFrame,
        labels: &BooleanChunked,
    ) -> Result<Vec<GroupComparison>> {
        let churned = labels.fill_null_with_values(false)?;
        let retained = (!labels).fill_null_with_values(false)?;

        let mut comparison = Vec::new();
        for field in COMPARISON_FIELDS {
            let Some(values) = df.field_f64(field)? else {
                continue;
            };
            let (Some(churners_mean), Some(retained_mean)) = (
                mean(&values.filter(&churned)?),
                mean(&values.filter(&retained)?),
            ) else {
                continue;
            };
            let difference = churners_mean - retained_mean;
            comparison.push(GroupComparison {
                field,
                churners_mean,
                retained_mean,
                difference,
                difference_percent: (retained_mean != 0.0)
                    .then(|| difference / retained_mean * 100.0),
            });
        }
        Ok(comparison)
    }

    fn largest_differences(comparison: &[GroupComparison]) -> Vec<Field> {
        let mut ranked: Vec<(Field, f64)> = comparison
            .iter()
            .filter_map(|c| Some((c.field, c.difference_percent?.abs())))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
            .into_iter()
            .take(TOP_DIFFERENCES)
            .map(|(field, _)| field)
            .collect()
    }

    fn risk_breakdown(
        &self,
        df: &DataFrame,
        labels: &BooleanChunked,
    ) -> Result<Vec<RiskBreakdown>> {
        let segments = assign_risk_segments(df, self.thresholds)?;
        let tags = segments.iter().map(|s| Some(s.as_str())).collect();
        let order = RiskSegment::ALL.map(|s| s.as_str());

        Ok(churn_by_tag(labels, tags, &order)?
            .into_iter()
            .filter_map(|group| {
                Some(RiskBreakdown {
                    segment: RiskSegment::from_label(&group.group)?,
                    churners: group.churners,
                    total: group.total,
                    churn_rate_percent: group.churn_rate_percent,
                })
            })
            .collect())
    }

    fn churn_by_state(df: &DataFrame) -> Result<Vec<ChurnBreakdown>> {
        let mut states = churn_by_field(df, Field::State)?;
        // Stable sort keeps alphabetical order among equal rates
        states.sort_by(|a, b| b.churn_rate_percent.total_cmp(&a.churn_rate_percent));
        Ok(states)
    }

    fn general_metrics(df: &DataFrame, labels: &BooleanChunked) -> Result<GeneralMetrics> {
        let total_churners = labels.num_trues();
        let labelled = labels.len() - labels.null_count();
        let field_mean = |field: Field| -> Result<Option<f64>> {
            Ok(df.field_f64(field)?.and_then(|values| mean(&values)))
        };

        Ok(GeneralMetrics {
            total_customers: df.height(),
            total_churners,
            churn_rate_percent: percentage(total_churners, labelled),
            international_plan_customers: plan_flags(df, Field::InternationalPlan)?.num_trues(),
            voice_mail_customers: plan_flags(df, Field::VoiceMailPlan)?.num_trues(),
            mean_service_calls: field_mean(Field::ServiceCalls)?,
            mean_day_minutes: field_mean(Field::DayMinutes)?,
            mean_day_charge: field_mean(Field::DayCharge)?,
        })
    }

    fn plan_insights(df: &DataFrame, labels: &BooleanChunked) -> Result<Vec<PlanInsight>> {
        let mut insights = Vec::new();
        for field in [Field::InternationalPlan, Field::VoiceMailPlan] {
            let Some(values) = df.field_str(field)? else {
                continue;
            };
            let with_plan = plan_flags(df, field)?;
            let without_plan = &!&with_plan & &values.is_not_null();
            insights.push(PlanInsight {
                field,
                with_plan_rate_percent: churn_rate_where(labels, &with_plan)?,
                without_plan_rate_percent: churn_rate_where(labels, &without_plan)?,
            });
        }
        Ok(insights)
    }
}

pub(crate) fn risk_thresholds(config: &PipelineConfig) -> RiskThresholds {
    RiskThresholds {
        high_service_calls: f64::from(config.high_service_calls),
        medium_service_calls: f64::from(config.medium_risk_service_calls),
    }
}
