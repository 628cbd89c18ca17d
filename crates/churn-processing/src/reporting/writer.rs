use super::files;
use crate::analysis::{ChurnBreakdown, EdaReport, assign_risk_segments, risk_thresholds};
use crate::cleaner::CleaningReport;
use crate::config::PipelineConfig;
use crate::error::{ChurnError, Result, ResultExt};
use crate::frame::FieldFrame;
use crate::metrics::{CHURNED_LABEL, DashboardReport, RETAINED_LABEL, customer_revenue};
use crate::profiler::InspectionSummary;
use crate::profiler::statistics::NumericSummary;
use crate::schema::Field;
use crate::utils::round_to;
use polars::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stage results persisted by [`ReportWriter::write_all`].
pub struct ReportBundle<'a> {
    pub inspection: &'a InspectionSummary,
    pub cleaning: &'a CleaningReport,
    pub exploration: &'a EdaReport,
    pub dashboard: &'a DashboardReport,
    pub cleaned: &'a DataFrame,
}

/// Directory layout under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub processed_dir: PathBuf,
    pub dashboard_dir: PathBuf,
    pub metrics_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            processed_dir: root.join("data").join("processed"),
            dashboard_dir: root.join("data").join("dashboard"),
            metrics_dir: root.join("outputs").join("metrics"),
            root,
        }
    }

    /// Default location of the execution log.
    pub fn execution_log(&self) -> PathBuf {
        self.root.join("outputs").join("execution_log.txt")
    }

    /// Create every output directory.
    pub fn create(&self) -> Result<()> {
        for dir in [&self.processed_dir, &self.dashboard_dir, &self.metrics_dir] {
            fs::create_dir_all(dir)
                .context(format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Writes stage reports as JSON and tables as CSV.
pub struct ReportWriter {
    layout: OutputLayout,
    config: PipelineConfig,
}

impl ReportWriter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            layout: OutputLayout::new(&config.output_dir),
            config: config.clone(),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Persist every report and dataset. Returns the written paths in order.
    pub fn write_all(&self, bundle: &ReportBundle<'_>) -> Result<Vec<PathBuf>> {
        self.layout.create()?;
        let metrics = &self.layout.metrics_dir;
        let eda = bundle.exploration;
        let dashboard = bundle.dashboard;
        let mut written = Vec::new();

        written.push(write_json(metrics.join(files::INSPECTION_SUMMARY), bundle.inspection)?);
        written.push(write_json(metrics.join(files::CLEANING_REPORT), bundle.cleaning)?);

        written.push(write_csv(
            metrics.join(files::NUMERIC_STATISTICS),
            &mut numeric_statistics_frame(eda)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_CORRELATIONS),
            &mut correlations_frame(eda)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURNER_COMPARISON),
            &mut comparison_frame(eda)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_BY_STATE),
            &mut breakdown_frame(Field::State.header(), &eda.churn_by_state)?,
        )?);
        let plans: Vec<serde_json::Value> = eda
            .plan_insights
            .iter()
            .map(|p| {
                json!({
                    "field": p.field,
                    "with_plan_rate_percent": p.with_plan_rate_percent,
                    "without_plan_rate_percent": p.without_plan_rate_percent,
                    "gap": p.gap(),
                })
            })
            .collect();
        written.push(write_json(
            metrics.join(files::GENERAL_METRICS),
            &json!({
                "general": eda.general_metrics,
                "service_calls": {
                    "threshold": eda.service_call_split.threshold,
                    "at_or_above_rate_percent": eda.service_call_split.at_or_above_rate_percent,
                    "below_rate_percent": eda.service_call_split.below_rate_percent,
                    "gap": eda.service_call_split.gap(),
                },
                "plans": plans,
                "top_churn_states": eda.top_churn_states,
                "largest_differences": eda.largest_differences,
            }),
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_INTERNATIONAL_PLAN),
            &mut breakdown_frame(
                Field::InternationalPlan.header(),
                &eda.churn_by_international_plan,
            )?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_VOICEMAIL_PLAN),
            &mut breakdown_frame(Field::VoiceMailPlan.header(), &eda.churn_by_voice_mail_plan)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_CUSTOMER_SERVICE),
            &mut breakdown_frame(Field::ServiceCalls.header(), &eda.churn_by_service_calls)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_RISK_SEGMENT),
            &mut risk_frame(eda)?,
        )?);

        written.push(write_json(metrics.join(files::DASHBOARD_KPIS), &dashboard.kpis)?);
        written.push(write_csv(
            metrics.join(files::REVENUE_BY_STATUS),
            &mut revenue_by_status_frame(dashboard)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_BY_REVENUE_BAND),
            &mut breakdown_frame("Revenue band", &dashboard.churn_by_revenue_band)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_BY_ACCOUNT_LENGTH),
            &mut breakdown_frame("Account length band", &dashboard.churn_by_account_length)?,
        )?);
        written.push(write_csv(
            metrics.join(files::CHURN_BY_AREA_CODE),
            &mut breakdown_frame(Field::AreaCode.header(), &dashboard.churn_by_area_code)?,
        )?);
        written.push(write_json(
            metrics.join(files::CHURNER_PROFILE),
            &dashboard.churner_profile,
        )?);
        written.push(write_csv(
            metrics.join(files::PLAN_COMBINATIONS),
            &mut plan_combinations_frame(dashboard)?,
        )?);

        written.push(write_csv(
            self.layout.processed_dir.join(files::CLEANED_DATASET),
            &mut bundle.cleaned.clone(),
        )?);
        written.push(write_csv(
            self.layout.dashboard_dir.join(files::DASHBOARD_DATASET),
            &mut self.dashboard_frame(bundle.cleaned)?,
        )?);

        info!(
            "Wrote {} files under {}",
            written.len(),
            self.layout.root.display()
        );
        Ok(written)
    }

    /// Cleaned rows plus churn label, revenue and risk segment columns.
    pub fn dashboard_frame(&self, cleaned: &DataFrame) -> Result<DataFrame> {
        let labels = match cleaned.field_bool(Field::Churn)? {
            Some(labels) => labels,
            None => BooleanChunked::full_null(Field::Churn.header().into(), cleaned.height()),
        };
        let churn_num = labels
            .clone()
            .into_series()
            .cast(&DataType::Int32)?
            .with_name("Churn_Num".into());
        let churn_label: StringChunked = labels
            .into_iter()
            .map(|l| l.map(|c| if c { CHURNED_LABEL } else { RETAINED_LABEL }))
            .collect();
        let revenue = customer_revenue(cleaned)?.apply_values(|r| round_to(r, 2));
        let segments: Vec<&str> = assign_risk_segments(cleaned, risk_thresholds(&self.config))?
            .into_iter()
            .map(|s| s.as_str())
            .collect();

        let mut df = cleaned.clone();
        df.with_column(churn_num)?;
        df.with_column(churn_label.with_name("Churn_Label".into()))?;
        df.with_column(revenue)?;
        df.with_column(Column::new("Risk_Segment".into(), segments))?;
        Ok(df)
    }
}

fn write_json<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<PathBuf> {
    let mut file =
        File::create(&path).context(format!("Failed to create {}", path.display()))?;
    file.write_all(serde_json::to_string_pretty(value)?.as_bytes())
        .context(format!("Failed to write {}", path.display()))?;
    debug!("Report saved: {}", path.display());
    Ok(path)
}

fn write_csv(path: PathBuf, df: &mut DataFrame) -> Result<PathBuf> {
    let mut file =
        File::create(&path).context(format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .map_err(|e| ChurnError::ReportWriteFailed(format!("{}: {}", path.display(), e)))?;
    debug!("Table saved: {}", path.display());
    Ok(path)
}

fn counts(values: impl Iterator<Item = usize>) -> Vec<u64> {
    values.map(|v| v as u64).collect()
}

fn rates(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values.map(|v| round_to(v, 2)).collect()
}

fn breakdown_frame(key: &str, rows: &[ChurnBreakdown]) -> Result<DataFrame> {
    let df = df!(
        key => rows.iter().map(|r| r.group.clone()).collect::<Vec<_>>(),
        "churners" => counts(rows.iter().map(|r| r.churners)),
        "total" => counts(rows.iter().map(|r| r.total)),
        "churn_rate_percent" => rates(rows.iter().map(|r| r.churn_rate_percent)),
    )?;
    Ok(df)
}

fn numeric_statistics_frame(eda: &EdaReport) -> Result<DataFrame> {
    let stats = &eda.numeric_statistics;
    let column = |f: fn(&NumericSummary) -> f64| -> Vec<f64> {
        stats.iter().map(|s| round_to(f(&s.summary), 4)).collect()
    };
    let cv: Vec<Option<f64>> = stats
        .iter()
        .map(|s| s.summary.cv_percent.map(|v| round_to(v, 2)))
        .collect();
    let df = df!(
        "field" => stats.iter().map(|s| s.field.header()).collect::<Vec<_>>(),
        "count" => counts(stats.iter().map(|s| s.summary.count)),
        "mean" => column(|s| s.mean),
        "std" => column(|s| s.std),
        "min" => column(|s| s.min),
        "25%" => column(|s| s.q25),
        "50%" => column(|s| s.median),
        "75%" => column(|s| s.q75),
        "max" => column(|s| s.max),
        "cv_percent" => cv,
    )?;
    Ok(df)
}

fn correlations_frame(eda: &EdaReport) -> Result<DataFrame> {
    let rows = &eda.correlations;
    let df = df!(
        "field" => rows.iter().map(|c| c.field.header()).collect::<Vec<_>>(),
        "correlation" => rows.iter().map(|c| round_to(c.correlation, 4)).collect::<Vec<_>>(),
        "notable" => rows.iter().map(|c| c.notable).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

fn comparison_frame(eda: &EdaReport) -> Result<DataFrame> {
    let rows = &eda.churner_comparison;
    let difference_percent: Vec<Option<f64>> = rows
        .iter()
        .map(|c| c.difference_percent.map(|d| round_to(d, 2)))
        .collect();
    let df = df!(
        "field" => rows.iter().map(|c| c.field.header()).collect::<Vec<_>>(),
        "churners_mean" => rows.iter().map(|c| round_to(c.churners_mean, 2)).collect::<Vec<_>>(),
        "retained_mean" => rows.iter().map(|c| round_to(c.retained_mean, 2)).collect::<Vec<_>>(),
        "difference" => rows.iter().map(|c| round_to(c.difference, 2)).collect::<Vec<_>>(),
        "difference_percent" => difference_percent,
    )?;
    Ok(df)
}

fn risk_frame(eda: &EdaReport) -> Result<DataFrame> {
    let rows = &eda.risk_segments;
    let df = df!(
        "Risk_Segment" => rows.iter().map(|r| r.segment.as_str()).collect::<Vec<_>>(),
        "churners" => counts(rows.iter().map(|r| r.churners)),
        "total" => counts(rows.iter().map(|r| r.total)),
        "churn_rate_percent" => rates(rows.iter().map(|r| r.churn_rate_percent)),
    )?;
    Ok(df)
}

fn revenue_by_status_frame(dashboard: &DashboardReport) -> Result<DataFrame> {
    let rows = &dashboard.revenue_by_status;
    let df = df!(
        "status" => rows.iter().map(|r| r.status.clone()).collect::<Vec<_>>(),
        "total_revenue" => rows.iter().map(|r| r.total_revenue).collect::<Vec<_>>(),
        "mean_revenue" => rows.iter().map(|r| r.mean_revenue).collect::<Vec<_>>(),
        "median_revenue" => rows.iter().map(|r| r.median_revenue).collect::<Vec<_>>(),
        "min_revenue" => rows.iter().map(|r| r.min_revenue).collect::<Vec<_>>(),
        "max_revenue" => rows.iter().map(|r| r.max_revenue).collect::<Vec<_>>(),
        "customers" => counts(rows.iter().map(|r| r.customers)),
    )?;
    Ok(df)
}

fn plan_combinations_frame(dashboard: &DashboardReport) -> Result<DataFrame> {
    let rows = &dashboard.plan_combinations;
    let df = df!(
        "combination" => rows.iter().map(|r| r.combination.clone()).collect::<Vec<_>>(),
        "total" => counts(rows.iter().map(|r| r.total)),
        "churners" => counts(rows.iter().map(|r| r.churners)),
        "churn_rate_percent" => rows.iter().map(|r| r.churn_rate_percent).collect::<Vec<_>>(),
        "mean_revenue" => rows.iter().map(|r| r.mean_revenue).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// Whether every expected output exists under `root`.
pub fn outputs_exist(root: &Path) -> bool {
    let layout = OutputLayout::new(root);
    files::METRICS
        .iter()
        .all(|name| layout.metrics_dir.join(name).is_file())
        && layout.processed_dir.join(files::CLEANED_DATASET).is_file()
        && layout.dashboard_dir.join(files::DASHBOARD_DATASET).is_file()
}
