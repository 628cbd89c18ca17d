//! Report persistence.
//!
//! [`ReportWriter`] lays out the output directory and writes every stage
//! result for the downstream dashboard:
//!
//! ```text
//! <output_dir>/
//!   data/processed/cleaned.csv
//!   data/dashboard/telecom_churn_full.csv
//!   outputs/metrics/01_inspection_summary.json ... 18_plan_combinations.csv
//! ```
//!
//! JSON files are pretty-printed with `serde_json`; tables are written with
//! polars' `CsvWriter`.

mod writer;

pub use writer::{OutputLayout, ReportBundle, ReportWriter, outputs_exist};

/// Output file names.
pub mod files {
    pub const INSPECTION_SUMMARY: &str = "01_inspection_summary.json";
    pub const CLEANING_REPORT: &str = "02_cleaning_report.json";
    pub const NUMERIC_STATISTICS: &str = "03_numeric_statistics.csv";
    pub const CHURN_CORRELATIONS: &str = "04_churn_correlations.csv";
    pub const CHURNER_COMPARISON: &str = "05_churner_comparison.csv";
    pub const CHURN_BY_STATE: &str = "06_churn_by_state.csv";
    pub const GENERAL_METRICS: &str = "07_general_metrics.json";
    pub const CHURN_INTERNATIONAL_PLAN: &str = "08_churn_international_plan.csv";
    pub const CHURN_VOICEMAIL_PLAN: &str = "09_churn_voicemail_plan.csv";
    pub const CHURN_CUSTOMER_SERVICE: &str = "10_churn_customer_service.csv";
    pub const CHURN_RISK_SEGMENT: &str = "11_churn_risk_segment.csv";
    pub const DASHBOARD_KPIS: &str = "12_dashboard_kpis.json";
    pub const REVENUE_BY_STATUS: &str = "13_revenue_by_status.csv";
    pub const CHURN_BY_REVENUE_BAND: &str = "14_churn_by_revenue_band.csv";
    pub const CHURN_BY_ACCOUNT_LENGTH: &str = "15_churn_by_account_length.csv";
    pub const CHURN_BY_AREA_CODE: &str = "16_churn_by_area_code.csv";
    pub const CHURNER_PROFILE: &str = "17_churner_profile.json";
    pub const PLAN_COMBINATIONS: &str = "18_plan_combinations.csv";

    pub const CLEANED_DATASET: &str = "cleaned.csv";
    pub const DASHBOARD_DATASET: &str = "telecom_churn_full.csv";

    /// Every file under `outputs/metrics`, in write order.
    pub const METRICS: [&str; 18] = [
        INSPECTION_SUMMARY,
        CLEANING_REPORT,
        NUMERIC_STATISTICS,
        CHURN_CORRELATIONS,
        CHURNER_COMPARISON,
        CHURN_BY_STATE,
        GENERAL_METRICS,
        CHURN_INTERNATIONAL_PLAN,
        CHURN_VOICEMAIL_PLAN,
        CHURN_CUSTOMER_SERVICE,
        CHURN_RISK_SEGMENT,
        DASHBOARD_KPIS,
        REVENUE_BY_STATUS,
        CHURN_BY_REVENUE_BAND,
        CHURN_BY_ACCOUNT_LENGTH,
        CHURN_BY_AREA_CODE,
        CHURNER_PROFILE,
        PLAN_COMBINATIONS,
    ];
}
