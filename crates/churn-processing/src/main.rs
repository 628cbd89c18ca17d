//! CLI entry point for the telecom churn pipeline.

use anyhow::{Context, Result, anyhow};
use churn_processing::quality::CheckStatus;
use churn_processing::{
    ExecutionRecorder, FileExecutionLog, OutputLayout, Pipeline, PipelineConfig,
    PipelineConfigBuilder, PipelineResult, PreviewResult, TracingRecorder, read_dataset,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Telecom churn data-quality and analytics pipeline",
    long_about = "Validates a telecom customer churn dataset, runs an exploratory churn \
                  analysis and writes dashboard-ready metrics.\n\n\
                  EXAMPLES:\n  \
                  # Full run, outputs under the current directory\n  \
                  churn-processing -i data/raw/telecom_churn.csv\n\n  \
                  # Write outputs elsewhere with a looser rate tolerance\n  \
                  churn-processing -i churn.csv -o reports/ --rate-tolerance 7.5\n\n  \
                  # Preview inspection and cleaning checks\n  \
                  churn-processing -i churn.csv --dry-run"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long)]
    input: PathBuf,

    /// Output root; overrides the configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with a pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IQR multiplier for extreme-outlier bounds
    #[arg(long)]
    iqr_multiplier: Option<f64>,

    /// Tolerated charge deviation from the median rate, in percent
    #[arg(long)]
    rate_tolerance: Option<f64>,

    /// Keep results in memory; write no report files
    #[arg(long)]
    no_save: bool,

    /// Preview inspection and cleaning checks without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Execution log file; defaults to outputs/execution_log.txt under the output root
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input.display());
    let df = read_dataset(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    info!(
        "Dataset loaded successfully: {} rows x {} columns",
        df.height(),
        df.width()
    );

    if args.dry_run {
        let pipeline = Pipeline::builder().config(config).build()?;
        let preview = pipeline.preview(df)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&preview, &args.input, pipeline.config().display_precision);
        }
        return Ok(());
    }

    let pipeline = build_pipeline(&args, config)?;

    info!("{}", "=".repeat(80));
    info!("Starting churn pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.run(df) {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result.summary())?);
            } else {
                print_human_readable_summary(
                    &result,
                    &args.input,
                    pipeline.config().display_precision,
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Load the configuration file, then apply command-line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(base);
    if let Some(ref output) = args.output {
        builder = builder.output_dir(output);
    }
    if let Some(multiplier) = args.iqr_multiplier {
        builder = builder.outlier_iqr_multiplier(multiplier);
    }
    if let Some(tolerance) = args.rate_tolerance {
        builder = builder.rate_tolerance_percent(tolerance);
    }
    if args.no_save || args.dry_run {
        builder = builder.save_to_disk(false);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let log_path = args.log_file.clone().or_else(|| {
        config
            .save_to_disk
            .then(|| OutputLayout::new(&config.output_dir).execution_log())
    });

    let recorder: Arc<dyn ExecutionRecorder> = match log_path {
        Some(path) => {
            info!("Execution log: {}", path.display());
            Arc::new(FileExecutionLog::new(path)?)
        }
        None => Arc::new(TracingRecorder),
    };

    let mut builder = Pipeline::builder().config(config).recorder(recorder);

    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print the dry-run preview.
///
/// This function uses `println!` intentionally for user-facing CLI output.
fn print_preview(preview: &PreviewResult, input: &Path, precision: usize) {
    let inspection = &preview.inspection;
    let cleaning = &preview.cleaning;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of data-quality checks");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input.display());
    println!("  Rows: {}", inspection.total_rows);
    println!("  Columns: {}", inspection.total_columns);
    println!("  Numeric: {}", inspection.numeric_columns.len());
    println!("  Categorical: {}", inspection.categorical_columns.len());
    if !inspection.schema.missing.is_empty() {
        println!("  Missing known columns: {:?}", inspection.schema.missing);
    }
    if let Some(ref churn) = inspection.churn {
        println!(
            "  Churn rate: {:.*}% ({} level)",
            precision, churn.churn_rate_percent, churn.level
        );
    }
    println!();

    println!("COLUMN PROFILES");
    println!("{}", "-".repeat(40));
    println!("{:<26} {:<10} {:<8} {:<10}", "Column", "Type", "Unique", "Missing");
    println!("{}", "-".repeat(58));
    for profile in &inspection.column_profiles {
        println!(
            "{:<26} {:<10} {:<8} {:<10}",
            truncate_str(&profile.name, 25),
            profile.dtype,
            profile.unique_count,
            inspection.missing.for_column(&profile.name).unwrap_or(0)
        );
    }
    println!();

    println!("CLEANING PREVIEW");
    println!("{}", "-".repeat(40));
    for action in &cleaning.actions {
        println!("  - {}", action);
    }
    for check in &cleaning.rate_checks {
        match &check.check {
            CheckStatus::Evaluated(result) => println!(
                "  - {} rate: {} inconsistent of {} checked",
                check.category.display_name(),
                result.violations,
                result.rows_checked
            ),
            CheckStatus::NotEvaluated => println!(
                "  - {} rate: not evaluated (columns absent)",
                check.category.display_name()
            ),
        }
    }
    for check in &cleaning.range_checks {
        if let CheckStatus::Evaluated(count) = check.violations {
            let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
            println!(
                "  - {}: {} values outside [{}, {}]",
                check.field,
                count,
                bound(check.min),
                bound(check.max)
            );
        }
    }
    println!();
    println!(
        "Rows after cleaning: {} ({:.*}% loss)",
        cleaning.final_rows, precision, cleaning.data_loss_percent
    );
    println!("{}", "=".repeat(80));
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(result: &PipelineResult, input: &Path, precision: usize) {
    let summary = result.summary();
    let kpis = &result.dashboard.kpis;
    let eda = &result.exploration;

    println!();
    println!("{}", "=".repeat(80));
    println!("CHURN PIPELINE COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        input.display(),
        result.inspection.total_rows,
        result.inspection.total_columns
    );
    println!();

    println!("Data Quality:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({:.*}% loss)",
        summary.rows_before, summary.rows_after, precision, summary.data_loss_percent
    );
    println!("  Duplicates removed: {}", summary.duplicates_removed);
    println!("  Rows with negative values removed: {}", summary.negative_rows_removed);
    println!("  Missing values: {}", summary.missing_values);
    println!("  Extreme outliers (kept): {}", summary.extreme_outliers);
    println!("  Rate inconsistencies: {}", summary.rate_violations);
    println!("  Completeness: {:.*}%", precision, summary.completeness_percent);
    println!();

    println!("Churn:");
    println!(
        "  Customers: {} ({} churned, {} active)",
        kpis.total_customers, kpis.total_churners, kpis.active_customers
    );
    println!("  Churn rate: {:.*}%", precision, kpis.churn_rate_percent);
    println!(
        "  Estimated revenue loss: {:.*}",
        precision, kpis.estimated_revenue_loss
    );
    if let Some(gap) = eda.service_call_split.gap() {
        println!(
            "  Customers with {}+ service calls churn {:.*} points more",
            eda.service_call_split.threshold, precision, gap
        );
    }
    for insight in &eda.plan_insights {
        if let Some(gap) = insight.gap() {
            println!(
                "  {}: {:+.*} points with the plan",
                insight.field, precision, gap
            );
        }
    }
    println!();

    let notable: Vec<_> = eda.correlations.iter().filter(|c| c.notable).collect();
    if !notable.is_empty() {
        println!("Notable correlations with churn:");
        for correlation in notable {
            println!("  {:<26} {:+.4}", correlation.field.header(), correlation.correlation);
        }
        println!();
    }

    if summary.files_written > 0 {
        println!("Files written: {}", summary.files_written);
        for path in result.written_files.iter().take(3) {
            println!("  {}", path.display());
        }
        if result.written_files.len() > 3 {
            println!("  ... and {} more", result.written_files.len() - 3);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
