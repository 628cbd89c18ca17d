//! Integration tests for the churn pipeline.
//!
//! These tests run the pipeline end to end on a small telecom sample that
//! contains one duplicate row and one row with negative usage values.

use churn_processing::reporting::{files, outputs_exist};
use churn_processing::{
    ChurnError, DataQualityValidator, ExecutionRecorder, Field, FieldFrame, FileExecutionLog,
    MemoryRecorder, OutputLayout, Pipeline, PipelineConfig, PipelineStage, ProgressUpdate,
    read_dataset,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_sample() -> DataFrame {
    read_dataset(fixtures_path().join("telecom_sample.csv")).expect("Failed to read sample")
}

fn in_memory_pipeline() -> Pipeline {
    Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .build()
        .unwrap()
}

/// Copy the sample without the columns whose header matches `drop`.
fn write_sample_without(dir: &std::path::Path, drop: &str) -> PathBuf {
    let content = fs::read_to_string(fixtures_path().join("telecom_sample.csv")).unwrap();
    let mut lines = content.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let skip = header.iter().position(|h| *h == drop).unwrap();

    let strip = |line: &str| {
        line.split(',')
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, cell)| cell)
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut out = vec![strip(&header.join(","))];
    out.extend(lines.map(strip));
    let path = dir.join("sample.csv");
    fs::write(&path, out.join("\n")).unwrap();
    path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_sample_loads_with_complete_schema() {
    let df = load_sample();

    assert_eq!(df.height(), 16);
    assert_eq!(df.width(), 20);
    assert!(df.schema_report().is_complete());
    let minutes = df.field_f64(Field::DayMinutes).unwrap().unwrap();
    assert_eq!(minutes.get(0), Some(265.1));
    assert_eq!(df.column("Churn").unwrap().dtype(), &DataType::Boolean);
    assert_eq!(df.column("Area code").unwrap().dtype(), &DataType::Int64);
}

#[test]
fn test_text_in_numeric_column_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "State,Total day minutes,Total day charge\nKS,abc,45.07\nOH,161.6,27.47\n",
    )
    .unwrap();

    let result = read_dataset(&path);

    assert!(matches!(
        result,
        Err(ChurnError::SchemaMismatch { ref column, .. }) if column == "Total day minutes"
    ));
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_in_memory() {
    let result = in_memory_pipeline().run(load_sample()).unwrap();
    let summary = result.summary();

    assert_eq!(summary.rows_before, 16);
    assert_eq!(summary.duplicates_removed, 1);
    assert_eq!(summary.negative_rows_removed, 1);
    assert_eq!(summary.rows_after, 14);
    assert_eq!(summary.missing_values, 0);
    assert_eq!(summary.rate_violations, 0);
    assert_eq!(summary.files_written, 0);
    assert_eq!(result.cleaned.height(), 14);

    assert_eq!(result.inspection.total_rows, 16);
    assert_eq!(result.inspection.duplicate_rows, 1);
}

#[test]
fn test_full_pipeline_churn_metrics() {
    let result = in_memory_pipeline().run(load_sample()).unwrap();
    let kpis = &result.dashboard.kpis;

    assert_eq!(kpis.total_customers, 14);
    assert_eq!(kpis.total_churners, 4);
    assert_eq!(kpis.active_customers, 10);
    assert!((kpis.churn_rate_percent - 28.57).abs() < 1e-9);
    assert!((kpis.churn_rate_percent + kpis.retention_rate_percent - 100.0).abs() < 1e-6);

    let general = &result.exploration.general_metrics;
    assert_eq!(general.total_customers, 14);
    assert_eq!(general.total_churners, 4);
}

#[test]
fn test_frequent_callers_churn_more() {
    let result = in_memory_pipeline().run(load_sample()).unwrap();
    let split = &result.exploration.service_call_split;

    assert_eq!(split.threshold, 4);
    assert_eq!(split.at_or_above_rate_percent, Some(100.0));
    assert!(split.gap().unwrap() > 0.0);
}

#[test]
fn test_rate_checks_cover_every_category() {
    let result = in_memory_pipeline().run(load_sample()).unwrap();
    let checks = &result.cleaning.rate_checks;

    assert_eq!(checks.len(), 4);
    for check in checks {
        let rate = check.check.evaluated().expect("all charge columns present");
        assert_eq!(rate.rows_checked, 14);
        assert_eq!(rate.violations, 0);
    }
}

#[test]
fn test_pipeline_without_churn_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_without(dir.path(), "Churn");
    let df = read_dataset(&path).unwrap();

    let result = in_memory_pipeline().run(df);

    assert!(matches!(result, Err(ChurnError::ColumnNotFound(ref c)) if c == "Churn"));
}

#[test]
fn test_missing_charge_column_is_not_evaluated() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_without(dir.path(), "Total intl charge");
    let df = read_dataset(&path).unwrap();

    let result = in_memory_pipeline().run(df).unwrap();

    let evaluated = result
        .cleaning
        .rate_checks
        .iter()
        .filter(|c| c.check.is_evaluated())
        .count();
    assert_eq!(evaluated, 3);
}

// ============================================================================
// Report Writing
// ============================================================================

#[test]
fn test_pipeline_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(load_sample())
        .unwrap();

    assert_eq!(result.written_files.len(), files::METRICS.len() + 2);
    assert!(outputs_exist(dir.path()));

    let layout = OutputLayout::new(dir.path());
    let kpis: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(layout.metrics_dir.join(files::DASHBOARD_KPIS)).unwrap(),
    )
    .unwrap();
    assert_eq!(kpis["total_customers"], 14);

    let dashboard =
        fs::read_to_string(layout.dashboard_dir.join(files::DASHBOARD_DATASET)).unwrap();
    let header = dashboard.lines().next().unwrap();
    assert!(header.contains("Churn_Label"));
    assert!(header.contains("Risk_Segment"));
    assert_eq!(dashboard.lines().count(), 15);
}

#[test]
fn test_preview_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();
    let pipeline = Pipeline::builder().config(config).build().unwrap();

    let preview = pipeline.preview(load_sample()).unwrap();

    assert_eq!(preview.inspection.total_rows, 16);
    assert_eq!(preview.cleaning.final_rows, 14);
    assert!(!outputs_exist(dir.path()));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

// ============================================================================
// Progress and Execution Log
// ============================================================================

#[test]
fn test_progress_is_monotonic_and_completes() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .run(load_sample())
        .unwrap();

    let updates = updates.lock().unwrap();
    assert!(!updates.is_empty());
    assert!(
        updates
            .windows(2)
            .all(|pair| pair[0].progress <= pair[1].progress + 1e-9)
    );
    let last = updates.last().unwrap();
    assert_eq!(last.stage, PipelineStage::Complete);
    assert!((last.progress - 1.0).abs() < 1e-9);
}

#[test]
fn test_recorder_receives_stage_events_in_order() {
    let recorder = Arc::new(MemoryRecorder::new());

    Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .recorder(recorder.clone())
        .build()
        .unwrap()
        .run(load_sample())
        .unwrap();

    let events: Vec<String> = recorder.events().into_iter().map(|(e, _)| e).collect();
    assert_eq!(
        events,
        vec![
            "initializing",
            "inspection",
            "cleaning",
            "exploration",
            "dashboard_metrics",
            "complete",
        ]
    );
}

#[test]
fn test_file_execution_log_records_failure() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sample_without(dir.path(), "Churn");
    let log_path = dir.path().join("outputs").join("execution_log.txt");
    let log = FileExecutionLog::new(&log_path).unwrap();

    let result = Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .recorder(Arc::new(log) as Arc<dyn ExecutionRecorder>)
        .build()
        .unwrap()
        .run(read_dataset(&data).unwrap());

    assert!(result.is_err());
    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("cleaning:"));
    assert!(content.lines().last().unwrap().contains("failed:"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_from_json_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "rate_tolerance_percent": 7.5, "save_to_disk": false }"#,
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();

    assert_eq!(config.rate_tolerance_percent, 7.5);
    assert!(!config.save_to_disk);
    assert_eq!(config.outlier_iqr_multiplier, 3.0);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "outlier_iqr_multiplier": -1.0 }"#).unwrap();

    assert!(PipelineConfig::from_json_file(&path).is_err());
}

// ============================================================================
// Validator on Loaded Data
// ============================================================================

#[test]
fn test_validator_flags_tampered_charge() {
    let validator = DataQualityValidator::default();
    let mut df = validator.deduplicate(&load_sample()).unwrap().frame;
    let charge = df.field_f64(Field::DayCharge).unwrap().unwrap();
    let tampered = charge.apply_values(|c| if c > 50.0 { c * 2.0 } else { c });
    df.with_column(tampered).unwrap();

    let check = validator
        .check_rate_consistency(&df, Field::DayMinutes, Field::DayCharge)
        .unwrap();

    let result = check.evaluated().unwrap();
    assert_eq!(result.violations, 1);
    assert_eq!(result.rows_checked, 15);
}
