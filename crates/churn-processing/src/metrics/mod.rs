//! Dashboard metrics.
//!
//! [`DashboardMetrics`] derives the figures a reporting dashboard consumes
//! from the cleaned frame: headline KPIs, revenue by churn status, churn by
//! revenue band, account-length band and area code, the churner profile and
//! the plan-combination table.
//!
//! Customer revenue is the sum of the four charge fields, with missing charges
//! counted as zero. Monetary and percentage figures are rounded to two
//! decimals.

use crate::analysis::{
    ChurnBreakdown, churn_by_field, churn_by_tag, churn_labels, plan_flags, service_calls,
};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::frame::FieldFrame;
use crate::profiler::statistics::{mean, median};
use crate::schema::Field;
use crate::utils::{percentage, round_to};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Name of the per-customer revenue column.
pub const REVENUE_COLUMN: &str = "Total_Revenue";

/// Label of churned customers in status tables.
pub const CHURNED_LABEL: &str = "Churned";

/// Label of retained customers in status tables.
pub const RETAINED_LABEL: &str = "Retained";

/// Revenue bands as `(label, upper bound)`, each band open below.
const REVENUE_BANDS: [(&str, f64); 5] = [
    ("0-40", 40.0),
    ("40-60", 60.0),
    ("60-80", 80.0),
    ("80-100", 100.0),
    ("100+", f64::INFINITY),
];

/// Account-length bands in days.
const TENURE_BANDS: [(&str, f64); 5] = [
    ("0-50 days", 50.0),
    ("51-100 days", 100.0),
    ("101-150 days", 150.0),
    ("151-200 days", 200.0),
    ("200+ days", f64::INFINITY),
];

/// Headline dashboard KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub total_customers: usize,
    pub total_churners: usize,
    pub active_customers: usize,
    pub churn_rate_percent: f64,
    pub retention_rate_percent: f64,
    pub total_revenue: f64,
    pub mean_revenue_per_customer: f64,
    pub mean_revenue_per_churner: f64,
    pub mean_revenue_per_active: f64,
    /// Mean churner revenue times the number of churners
    pub estimated_revenue_loss: f64,
}

/// Revenue aggregates for one churn status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueByStatus {
    pub status: String,
    pub total_revenue: f64,
    pub mean_revenue: f64,
    pub median_revenue: f64,
    pub min_revenue: f64,
    pub max_revenue: f64,
    pub customers: usize,
}

/// Averages over churned customers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnerProfile {
    pub total_churners: usize,
    pub mean_account_length: Option<f64>,
    pub mean_service_calls: Option<f64>,
    pub mean_day_minutes: Option<f64>,
    pub mean_revenue: Option<f64>,
    pub international_plan_percent: f64,
    pub voice_mail_plan_percent: f64,
    pub frequent_caller_percent: f64,
}

/// Churn and revenue for one international / voicemail plan combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCombination {
    /// `"<international plan> / <voice mail plan>"`
    pub combination: String,
    pub total: usize,
    pub churners: usize,
    pub churn_rate_percent: f64,
    pub mean_revenue: f64,
}

/// Result of the dashboard metrics stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub kpis: DashboardKpis,
    pub revenue_by_status: Vec<RevenueByStatus>,
    pub churn_by_revenue_band: Vec<ChurnBreakdown>,
    pub churn_by_account_length: Vec<ChurnBreakdown>,
    pub churn_by_area_code: Vec<ChurnBreakdown>,
    pub churner_profile: ChurnerProfile,
    pub plan_combinations: Vec<PlanCombination>,
}

/// Revenue of every row: the sum of the present charge fields.
pub fn customer_revenue(df: &DataFrame) -> Result<Float64Chunked> {
    let mut revenue = Float64Chunked::full(REVENUE_COLUMN.into(), 0.0, df.height());
    for field in Field::CHARGES {
        if let Some(charges) = df.field_f64(field)? {
            revenue = &revenue + &charges.fill_null_with_values(0.0)?;
        }
    }
    Ok(revenue)
}

/// Computes dashboard metrics from the cleaned frame.
pub struct DashboardMetrics {
    high_service_calls: f64,
}

impl DashboardMetrics {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            high_service_calls: f64::from(config.high_service_calls),
        }
    }

    /// Compute every dashboard table. Fails with `ColumnNotFound` when
    /// `Churn` is absent.
    pub fn compute(&self, df: &DataFrame) -> Result<DashboardReport> {
        let labels = churn_labels(df)?;
        let revenue = customer_revenue(df)?;
        info!("Computing dashboard metrics for {} customers", df.height());

        let kpis = Self::kpis(&labels, &revenue)?;
        info!(
            "Churn rate {:.2}%, estimated revenue loss {:.2}",
            kpis.churn_rate_percent, kpis.estimated_revenue_loss
        );

        let revenue_tags = band_tags(&REVENUE_BANDS, &revenue);
        let tenure_tags = match df.field_f64(Field::AccountLength)? {
            Some(values) => band_tags(&TENURE_BANDS, &values),
            None => vec![None; df.height()],
        };

        let churn_by_area_code = churn_by_field(df, Field::AreaCode)?
            .into_iter()
            .map(rounded)
            .collect();

        Ok(DashboardReport {
            kpis,
            revenue_by_status: Self::revenue_by_status(&labels, &revenue)?,
            churn_by_revenue_band: banded(&REVENUE_BANDS, &labels, revenue_tags)?,
            churn_by_account_length: banded(&TENURE_BANDS, &labels, tenure_tags)?,
            churn_by_area_code,
            churner_profile: self.churner_profile(df, &labels, &revenue)?,
            plan_combinations: Self::plan_combinations(df, &labels, &revenue)?,
        })
    }

    /// Customer counts cover every row; churners are rows labelled churned.
    fn kpis(labels: &BooleanChunked, revenue: &Float64Chunked) -> Result<DashboardKpis> {
        let total_customers = revenue.len();
        let total_churners = labels.num_trues();
        let total_revenue = revenue.sum().unwrap_or(0.0);
        let churn_rate = percentage(total_churners, total_customers);

        let churned = revenue.filter(&labels.fill_null_with_values(false)?)?;
        let active = revenue.filter(&(!labels).fill_null_with_values(false)?)?;
        let mean_churner = mean(&churned).unwrap_or(0.0);

        Ok(DashboardKpis {
            total_customers,
            total_churners,
            active_customers: total_customers - total_churners,
            churn_rate_percent: round_to(churn_rate, 2),
            retention_rate_percent: round_to(100.0 - churn_rate, 2),
            total_revenue: round_to(total_revenue, 2),
            mean_revenue_per_customer: if total_customers == 0 {
                0.0
            } else {
                round_to(total_revenue / total_customers as f64, 2)
            },
            mean_revenue_per_churner: round_to(mean_churner, 2),
            mean_revenue_per_active: round_to(mean(&active).unwrap_or(0.0), 2),
            estimated_revenue_loss: round_to(mean_churner * total_churners as f64, 2),
        })
    }

    fn revenue_by_status(
        labels: &BooleanChunked,
        revenue: &Float64Chunked,
    ) -> Result<Vec<RevenueByStatus>> {
        // Alphabetical, so "Churned" comes before "Retained"
        let statuses = [(CHURNED_LABEL, labels.clone()), (RETAINED_LABEL, !labels)];

        let mut rows = Vec::with_capacity(statuses.len());
        for (status, mask) in statuses {
            let values = revenue.filter(&mask.fill_null_with_values(false)?)?;
            let (Some(mean_revenue), Some(median_revenue), Some(min), Some(max)) =
                (mean(&values), median(&values), values.min(), values.max())
            else {
                continue;
            };
            rows.push(RevenueByStatus {
                status: status.to_string(),
                total_revenue: round_to(values.sum().unwrap_or(0.0), 2),
                mean_revenue: round_to(mean_revenue, 2),
                median_revenue: round_to(median_revenue, 2),
                min_revenue: round_to(min, 2),
                max_revenue: round_to(max, 2),
                customers: values.len(),
            });
        }
        Ok(rows)
    }

    fn churner_profile(
        &self,
        df: &DataFrame,
        labels: &BooleanChunked,
        revenue: &Float64Chunked,
    ) -> Result<ChurnerProfile> {
        let churned = labels.fill_null_with_values(false)?;
        let total_churners = churned.num_trues();

        let churner_mean = |values: &Float64Chunked| -> Result<Option<f64>> {
            Ok(mean(&values.filter(&churned)?).map(|m| round_to(m, 2)))
        };
        let field_mean = |field: Field| -> Result<Option<f64>> {
            match df.field_f64(field)? {
                Some(values) => churner_mean(&values),
                None => Ok(None),
            }
        };
        let share_of_churners = |mask: &BooleanChunked| -> Result<f64> {
            let count = (&mask.fill_null_with_values(false)? & &churned).num_trues();
            Ok(round_to(percentage(count, total_churners), 2))
        };

        let frequent = service_calls(df)?.gt_eq(self.high_service_calls);

        Ok(ChurnerProfile {
            total_churners,
            mean_account_length: field_mean(Field::AccountLength)?,
            mean_service_calls: field_mean(Field::ServiceCalls)?,
            mean_day_minutes: field_mean(Field::DayMinutes)?,
            mean_revenue: churner_mean(revenue)?,
            international_plan_percent: share_of_churners(&plan_flags(
                df,
                Field::InternationalPlan,
            )?)?,
            voice_mail_plan_percent: share_of_churners(&plan_flags(df, Field::VoiceMailPlan)?)?,
            frequent_caller_percent: share_of_churners(&frequent)?,
        })
    }

    fn plan_combinations(
        df: &DataFrame,
        labels: &BooleanChunked,
        revenue: &Float64Chunked,
    ) -> Result<Vec<PlanCombination>> {
        let (Some(intl), Some(vmail)) = (
            df.field_str(Field::InternationalPlan)?,
            df.field_str(Field::VoiceMailPlan)?,
        ) else {
            return Ok(Vec::new());
        };

        let intl_name = Field::InternationalPlan.header();
        let vmail_name = Field::VoiceMailPlan.header();
        let churn = Field::Churn.header();
        let plans = DataFrame::new(vec![
            intl.with_name(intl_name.into()).into_column(),
            vmail.with_name(vmail_name.into()).into_column(),
            labels.clone().with_name(churn.into()).into_column(),
            revenue.clone().with_name(REVENUE_COLUMN.into()).into_column(),
        ])?;

        let grouped = plans
            .lazy()
            .filter(
                col(intl_name)
                    .is_not_null()
                    .and(col(vmail_name).is_not_null())
                    .and(col(churn).is_not_null()),
            )
            .group_by([col(intl_name), col(vmail_name)])
            .agg([
                len().alias("total"),
                col(churn).cast(DataType::UInt32).sum().alias("churners"),
                col(REVENUE_COLUMN).mean().alias("mean_revenue"),
            ])
            .sort([intl_name, vmail_name], SortMultipleOptions::default())
            .collect()?;

        let intl = grouped.column(intl_name)?.str()?;
        let vmail = grouped.column(vmail_name)?.str()?;
        let totals = grouped.column("total")?.cast(&DataType::UInt64)?;
        let churners = grouped.column("churners")?.cast(&DataType::UInt64)?;
        let mean_revenue = grouped.column("mean_revenue")?.f64()?;
        let (totals, churners) = (totals.u64()?, churners.u64()?);

        Ok((0..grouped.height())
            .map(|i| {
                let total = totals.get(i).unwrap_or(0) as usize;
                let churners = churners.get(i).unwrap_or(0) as usize;
                PlanCombination {
                    combination: format!(
                        "{} / {}",
                        intl.get(i).unwrap_or_default(),
                        vmail.get(i).unwrap_or_default()
                    ),
                    total,
                    churners,
                    churn_rate_percent: round_to(percentage(churners, total), 2),
                    mean_revenue: round_to(mean_revenue.get(i).unwrap_or(0.0), 2),
                }
            })
            .collect())
    }
}

/// Index of the band `(previous upper, upper]` containing `value`.
///
/// Values at or below zero fall outside every band.
fn band_index(bands: &[(&str, f64)], value: Option<f64>) -> Option<usize> {
    let value = value?;
    if value <= 0.0 || value.is_nan() {
        return None;
    }
    bands.iter().position(|(_, upper)| value <= *upper)
}

/// Band label of every value, `None` outside every band.
fn band_tags(bands: &[(&'static str, f64)], values: &Float64Chunked) -> Vec<Option<&'static str>> {
    values
        .into_iter()
        .map(|v| band_index(bands, v).map(|i| bands[i].0))
        .collect()
}

/// Churn per band, in band order. Empty bands are left out.
fn banded(
    bands: &[(&'static str, f64)],
    labels: &BooleanChunked,
    tags: Vec<Option<&str>>,
) -> Result<Vec<ChurnBreakdown>> {
    let order: Vec<&str> = bands.iter().map(|(label, _)| *label).collect();
    Ok(churn_by_tag(labels, tags, &order)?
        .into_iter()
        .map(rounded)
        .collect())
}

fn rounded(mut breakdown: ChurnBreakdown) -> ChurnBreakdown {
    breakdown.churn_rate_percent = round_to(breakdown.churn_rate_percent, 2);
    breakdown
}
