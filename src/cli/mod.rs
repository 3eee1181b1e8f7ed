//! Fraud pipeline CLI module
//!
//! Command-line interface for the gold export and evaluation runs, plus
//! training and scoring with a persisted model bundle.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::pipeline::{extract_labels, FraudPipeline, ModelBundle, PreparedData, TrainedPipeline};
use crate::resampling::class_counts;
use crate::scoring::Threshold;
use crate::utils::{describe, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn summary_box(rows: &[(&str, String)]) {
    println!();
    line_box_top();
    for (key, val) in rows {
        line_box(&kv(&format!("{:<14}", key), val));
    }
    line_box_bottom();
    println!();
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fraud-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fraud-detection training and evaluation pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train, score every row and export the gold table
    Gold {
        /// Input data file (CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output gold file
        #[arg(short, long)]
        output: PathBuf,

        /// Decision threshold on the fraud probability
        #[arg(long)]
        threshold: Option<f64>,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Label column name
        #[arg(short, long)]
        label: Option<String>,

        /// Also persist the fitted model bundle here
        #[arg(long)]
        save_bundle: Option<PathBuf>,
    },

    /// Train and report metrics on the held-out partition
    Evaluate {
        /// Input data file (CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Decision threshold on the fraud probability
        #[arg(long)]
        threshold: Option<f64>,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Label column name
        #[arg(short, long)]
        label: Option<String>,

        /// Write confusion matrix and curve points as JSON into this directory
        #[arg(long)]
        plots_dir: Option<PathBuf>,
    },

    /// Fit the pipeline and save a model bundle
    Train {
        /// Input data file (CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output bundle file (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Label column name
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Export a gold table with a saved model bundle
    Predict {
        /// Model bundle produced by `train`
        #[arg(short, long)]
        bundle: PathBuf,

        /// Input data file (CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output gold file
        #[arg(short, long)]
        output: PathBuf,

        /// Decision threshold on the fraud probability
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Label column name
        #[arg(short, long)]
        label: Option<String>,
    },
}

// ─── Shared steps ──────────────────────────────────────────────────────────────

/// Configuration file (or defaults) with command-line overrides applied
pub fn resolve_config(config: Option<&Path>, label: Option<&str>) -> anyhow::Result<PipelineConfig> {
    let mut resolved = match config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(label) = label {
        resolved = resolved.with_label_column(label);
    }
    resolved.validate()?;
    Ok(resolved)
}

fn threshold_or(value: Option<f64>, default: Threshold) -> anyhow::Result<Threshold> {
    match value {
        Some(v) => Ok(Threshold::new(v)?),
        None => Ok(default),
    }
}

fn load_source(pipeline: &FraudPipeline, path: &Path) -> anyhow::Result<DataFrame> {
    step_run("Loading data");
    let start = Instant::now();
    let df = pipeline
        .load(path)
        .with_context(|| format!("reading {}", path.display()))?;
    step_done(&format!("{} rows × {} cols in {:.2?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

fn fit_pipeline(pipeline: &FraudPipeline, df: &DataFrame) -> anyhow::Result<(PreparedData, TrainedPipeline)> {
    step_run("Preparing features");
    let start = Instant::now();
    let prepared = pipeline.prepare(df)?;
    step_done(&format!(
        "{} features, {} train / {} test in {:.2?}",
        prepared.feature_names().len(),
        prepared.n_train(),
        prepared.n_test(),
        start.elapsed()
    ));
    if prepared.n_dropped > 0 {
        println!("  {} {}", "!".yellow(), muted(&format!("{} rows without a label dropped", prepared.n_dropped)));
    }

    step_run(&format!("Balancing and training {}", "XGBoost".cyan()));
    let start = Instant::now();
    let trained = pipeline.train(&prepared)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    let counts: Vec<String> = trained
        .balanced_counts()
        .iter()
        .map(|(class, n)| format!("{}: {}", class, n))
        .collect();
    step_ok(&format!("balanced sample  {}", counts.join("  ")));
    if let Some(loss) = trained.model().train_log_loss() {
        step_ok(&format!("train logloss    {:.4}", loss));
    }

    Ok((prepared, trained))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_gold(
    data_path: &Path,
    output: &Path,
    threshold: Option<f64>,
    config: Option<&Path>,
    label: Option<&str>,
    save_bundle: Option<&Path>,
) -> anyhow::Result<()> {
    section("Gold export");

    let config = resolve_config(config, label)?;
    let threshold = threshold_or(threshold, config.thresholds.gold()?)?;
    let pipeline = FraudPipeline::new(config)?;

    let df = load_source(&pipeline, data_path)?;
    let (_, trained) = fit_pipeline(&pipeline, &df)?;

    step_run(&format!("Scoring all rows at threshold {}", threshold));
    let report = trained.export_gold(&df, output, threshold)?;
    step_done(&format!("{} predicted fraud", report.n_predicted_positive));

    if !report.columns_missing.is_empty() {
        println!(
            "  {} {} {}",
            "!".yellow(),
            muted("columns not found:"),
            report.columns_missing.join(", ").yellow()
        );
    }

    if let Some(bundle_path) = save_bundle {
        step_run(&format!("Saving bundle → {}", bundle_path.display()));
        trained.into_bundle().save(bundle_path)?;
        step_done("");
    }

    summary_box(&[
        ("Output", report.path.display().to_string()),
        ("Rows", report.rows_written.to_string()),
        ("Columns", report.columns_written.join(", ")),
        ("Threshold", threshold.to_string()),
    ]);
    Ok(())
}

pub fn cmd_evaluate(
    data_path: &Path,
    threshold: Option<f64>,
    config: Option<&Path>,
    label: Option<&str>,
    plots_dir: Option<&Path>,
) -> anyhow::Result<()> {
    section("Evaluate");

    let config = resolve_config(config, label)?;
    let threshold = threshold_or(threshold, config.thresholds.evaluation()?)?;
    let pipeline = FraudPipeline::new(config)?;

    let df = load_source(&pipeline, data_path)?;
    let (prepared, trained) = fit_pipeline(&pipeline, &df)?;

    step_run(&format!("Scoring test partition at threshold {}", threshold));
    let report = trained.evaluate(&prepared, threshold)?;
    step_done(&format!("{} rows", report.n_samples));

    section("Classification Report");
    for line in report.render_text().lines() {
        println!("  {}", line);
    }

    section("Diagnostics");
    for line in report.render_diagnostics().lines() {
        println!("  {}", line);
    }

    if let Some(dir) = plots_dir {
        let written = report.write_json(dir)?;
        for path in written {
            step_ok(&format!("wrote {}", path.display()));
        }
    }

    summary_box(&[
        ("Accuracy", format!("{:.4}", report.report.accuracy)),
        ("ROC AUC", format!("{:.4}", report.roc_auc)),
        ("Avg precision", format!("{:.4}", report.average_precision)),
        ("Threshold", threshold.to_string()),
    ]);
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    output: &Path,
    config: Option<&Path>,
    label: Option<&str>,
) -> anyhow::Result<()> {
    section("Train");

    let config = resolve_config(config, label)?;
    let pipeline = FraudPipeline::new(config)?;

    let df = load_source(&pipeline, data_path)?;
    let (_, trained) = fit_pipeline(&pipeline, &df)?;

    step_run(&format!("Saving bundle → {}", output.display()));
    let bundle = trained.into_bundle();
    bundle.save(output)?;
    step_done(&format!("{} trees", bundle.model.n_trees()));

    println!();
    Ok(())
}

pub fn cmd_predict(
    bundle_path: &Path,
    data_path: &Path,
    output: &Path,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading bundle");
    let bundle = ModelBundle::load(bundle_path)
        .with_context(|| format!("loading bundle {}", bundle_path.display()))?;
    step_done(&format!("v{}, trained {}", bundle.version, bundle.trained_at.format("%Y-%m-%d %H:%M")));

    let threshold = threshold_or(threshold, bundle.config.thresholds.gold()?)?;
    let trained = bundle.into_pipeline();

    step_run("Loading data");
    let df = DataLoader::new()
        .with_options(trained.config().csv.clone())
        .load_csv(data_path)
        .with_context(|| format!("reading {}", data_path.display()))?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run(&format!("Scoring at threshold {}", threshold));
    let report = trained.export_gold(&df, output, threshold)?;
    step_done(&format!("{} predicted fraud", report.n_predicted_positive));

    summary_box(&[
        ("Output", report.path.display().to_string()),
        ("Rows", report.rows_written.to_string()),
        ("Columns", report.columns_written.join(", ")),
    ]);
    Ok(())
}

pub fn cmd_info(data_path: &Path, label: Option<&str>) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_csv(data_path)?;
    let summary = describe(&df);

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), summary.n_rows);
    println!("  {:<12} {}", muted("Columns"), summary.n_cols);
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<28} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in &summary.columns {
        let nulls = if col.null_count > 0 {
            col.null_count.to_string().yellow()
        } else {
            col.null_count.to_string().normal()
        };
        println!("  {:<28} {:<12} {:>6}", col.name, col.dtype.truecolor(140, 140, 140), nulls);
    }

    let label = label.unwrap_or(crate::config::DEFAULT_LABEL_COLUMN);
    if df.column(label).is_ok() {
        section("Label distribution");
        let (labelled, _) = crate::pipeline::drop_null_labels(&df, label)?;
        let y = extract_labels(&labelled, label)?;
        for (class, count) in class_counts(&y) {
            let share = count as f64 / y.len().max(1) as f64 * 100.0;
            println!("  {:<12} {:>8} {}", muted(&class.to_string()), count, dim(&format!("{:.2}%", share)));
        }
    }

    println!();
    Ok(())
}
