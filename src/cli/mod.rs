//! Housing AutoML CLI Module
//!
//! Command-line interface for training, prediction, validation and bundle
//! inspection.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::DataIngestionArtifact;
use crate::config::{ConfigStore, PipelineConfig};
use crate::export::CombinedEstimator;
use crate::pipeline::Pipeline;
use crate::utils;
use crate::validation::SchemaValidator;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

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

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "housing-automl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Config-driven model selection for tabular regression")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run validation, transformation and model selection
    Train {
        /// Training split (CSV)
        #[arg(long)]
        train: PathBuf,

        /// Test split (CSV)
        #[arg(long)]
        test: PathBuf,

        /// Pipeline config (YAML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Schema file, overrides the pipeline config
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Model search config, overrides the pipeline config
        #[arg(short, long)]
        model_config: Option<PathBuf>,

        /// Artifact root, overrides the pipeline config
        #[arg(short, long)]
        artifact_dir: Option<PathBuf>,

        /// Run id, overrides the pipeline config
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Predict with a trained bundle
    Predict {
        /// Combined estimator file
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file (CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check every record of a CSV against the schema
    Validate {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Accept booleans in numerical columns
        #[arg(long)]
        allow_bool_as_numeric: bool,
    },

    /// Show the metadata of a trained bundle
    Info {
        /// Combined estimator file
        #[arg(short, long)]
        model: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    train: &Path,
    test: &Path,
    config_path: Option<&Path>,
    schema: Option<&Path>,
    model_config: Option<&Path>,
    artifact_dir: Option<&Path>,
    run_id: Option<&str>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => ConfigStore::load_pipeline(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = schema {
        config = config.with_schema_file(path);
    }
    if let Some(path) = model_config {
        config = config.with_model_config_file(path);
    }
    if let Some(dir) = artifact_dir {
        config = config.with_artifact_dir(dir);
    }
    if let Some(id) = run_id {
        config = config.with_run_id(id);
    }

    step_run("Loading configuration");
    let mut pipeline = Pipeline::from_config(config)?;
    step_done(&format!(
        "{} candidate models",
        pipeline.model_config().model_selection.len()
    ));

    let ctx = pipeline.context();
    let ingestion = DataIngestionArtifact::new(train, test);

    step_run(&format!("Running pipeline {}", ctx.run_id().cyan()));
    let start = Instant::now();
    let artifact = pipeline.run(&ingestion, &ctx)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    line_box_top();
    line_box_center(&format!("{}", artifact.message().white().bold()));
    line_box_sep();
    line_box(&kv("Train R²     ", &format!("{:.4}", artifact.train_accuracy())));
    line_box(&kv("Test R²      ", &format!("{:.4}", artifact.test_accuracy())));
    line_box(&kv("Train RMSE   ", &format!("{:.4}", artifact.train_rmse())));
    line_box(&kv("Test RMSE    ", &format!("{:.4}", artifact.test_rmse())));
    line_box(&kv("Model score  ", &format!("{:.4}", artifact.model_accuracy())));
    line_box_sep();
    line_box(&kv("Bundle", &artifact.trained_model_file_path().display().to_string()));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading bundle");
    let estimator = CombinedEstimator::load(model_path)?;
    step_done(estimator.model_identifier());

    step_run("Loading data");
    let df = utils::load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Predicting");
    let start = Instant::now();
    let predictions = estimator.predict(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    match output {
        Some(path) => {
            let mut out = df.clone();
            out.with_column(Series::new("prediction".into(), predictions.to_vec()))?;
            utils::save_csv(&mut out, path)?;
            println!("  {} {}", ok("✓"), format!("Saved → {}", path.display()));
        }
        None => {
            println!();
            for (row, value) in predictions.iter().enumerate().take(10) {
                println!("  {:>6}  {}", muted(&row.to_string()), format!("{:.4}", value).white());
            }
            if predictions.len() > 10 {
                println!("  {}", dim(&format!("… {} more", predictions.len() - 10)));
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_validate(schema_path: &Path, data_path: &Path, allow_bool_as_numeric: bool) -> anyhow::Result<()> {
    section("Validate");

    let schema = ConfigStore::load_schema(schema_path)?;
    step_run("Loading data");
    let df = utils::load_uncast(data_path, &schema)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let validator = SchemaValidator::new().with_bool_as_numeric(allow_bool_as_numeric);
    let records = utils::schema_records(&df, &schema)?;
    let invalid: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| !validator.validate(record, &schema))
        .map(|(row, _)| row)
        .collect();

    println!();
    println!("  {:<16} {}", muted("Records"), records.len().to_string().white());
    println!("  {:<16} {}", muted("Invalid"), invalid.len().to_string().white());
    if let Some(first) = invalid.first() {
        println!("  {:<16} {}", muted("First invalid"), first.to_string().white());
        println!();
        anyhow::bail!("{} of {} records do not match the schema", invalid.len(), records.len());
    }
    println!("  {} {}", ok("✓"), "All records match the schema");
    println!();
    Ok(())
}

pub fn cmd_info(model_path: &Path) -> anyhow::Result<()> {
    section("Bundle");

    let estimator = CombinedEstimator::load(model_path)?;
    let header = estimator.header();
    let transformer = estimator.transformer();

    println!("  {:<16} {}", muted("Format"), format!("{} v{}", header.format, header.version).white());
    println!("  {:<16} {}", muted("Created"), header.created_at.white());
    println!("  {:<16} {}", muted("Run"), header.run_id.white());
    println!("  {:<16} {}", muted("Model"), estimator.model_identifier().white());
    println!("  {:<16} {}", muted("Family"), estimator.model().family().white());
    println!("  {:<16} {}", muted("Inputs"), transformer.input_columns().join(", ").white());
    println!(
        "  {:<16} {}",
        muted("Features"),
        transformer.feature_names().len().to_string().white()
    );
    println!();
    Ok(())
}
