//! ExoSeeker CLI Module
//!
//! Command-line interface for training, prediction, evaluation and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use crate::evaluation::{ConfusionMatrix, EvaluationReport};
use crate::export::ModelStore;
use crate::training::{EstimatorSelection, Hyperparameters};
use crate::utils::DataLoader;
use crate::workflow::{evaluate_action, predict_action, train_action, ScalingPolicy, TrainRequest};

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

/// Horizontal bar for a value in [0, 1]
fn bar(value: f64, width: usize) -> String {
    let filled = ((value.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "exoseeker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classify Kepler objects of interest as confirmed exoplanets or candidates")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the stacked ensemble on a labeled KOI table
    Train {
        /// Labeled KOI CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Extra base estimators (rf, gb, mlp); the random forest is always used
        #[arg(short, long, default_value = "")]
        estimators: String,

        /// Random forest trees
        #[arg(long, default_value_t = 100)]
        rf_n_estimators: usize,

        /// Random forest depth
        #[arg(long, default_value_t = 3)]
        rf_max_depth: usize,

        /// Gradient boosting rounds
        #[arg(long, default_value_t = 100)]
        gb_n_estimators: usize,

        /// Gradient boosting depth
        #[arg(long, default_value_t = 3)]
        gb_max_depth: usize,

        /// MLP epochs
        #[arg(long, default_value_t = 100)]
        mlp_max_iter: usize,

        /// MLP L2 strength
        #[arg(long, default_value_t = 0.0001)]
        mlp_alpha: f64,

        /// Seed for the split and every estimator
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Fraction of rows used for training
        #[arg(long, default_value_t = 0.7)]
        train_fraction: f64,

        /// Model slot (defaults to $EXOSEEKER_MODEL_PATH or model.json)
        #[arg(short, long)]
        model_path: Option<PathBuf>,
    },

    /// Classify an unlabeled KOI table with the stored model
    Predict {
        /// KOI CSV to classify
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file
        #[arg(short, long, default_value = "predictions.csv")]
        output: PathBuf,

        /// Scale with the batch's own statistics instead of the training ones
        #[arg(long)]
        batch_scaling: bool,

        /// Model slot
        #[arg(short, long)]
        model_path: Option<PathBuf>,
    },

    /// Score the stored model on a labeled KOI table
    Evaluate {
        /// Labeled KOI CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Model slot
        #[arg(short, long)]
        model_path: Option<PathBuf>,
    },

    /// Start the web server
    Serve {
        /// Server port (defaults to $API_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (defaults to $API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Model slot
        #[arg(short, long)]
        model_path: Option<PathBuf>,
    },
}

fn store_for(model_path: Option<&Path>) -> ModelStore {
    model_path.map(ModelStore::new).unwrap_or_else(ModelStore::from_env)
}

fn load_table(path: &Path) -> anyhow::Result<polars::prelude::DataFrame> {
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let df = DataLoader::new().load_csv_path(path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

fn print_report(report: &EvaluationReport) {
    section("Metrics");
    let m = &report.metrics;
    let rows = [
        ("Accuracy", m.accuracy),
        ("Sensitivity", m.sensitivity),
        ("Specificity", m.specificity),
        ("Precision", m.precision),
    ];
    for (label, value) in rows {
        println!(
            "  {:<14} {} {}",
            muted(label),
            accent(&bar(value, 24)),
            format!("{:.2}%", value * 100.0).white().bold()
        );
    }
    println!("  {:<14} {} {}", muted("F1 Score"), accent(&bar(m.f1, 24)), format!("{:.4}", m.f1).white().bold());

    section("Confusion Matrix");
    println!(
        "  {:<12} {:>22} {:>22}",
        muted("actual\\pred"),
        muted(ConfusionMatrix::ROW_LABELS[0]),
        muted(ConfusionMatrix::ROW_LABELS[1])
    );
    for (label, row) in ConfusionMatrix::ROW_LABELS.iter().zip(report.confusion_matrix.cells.iter()) {
        let cells: Vec<String> = row
            .iter()
            .map(|c| format!("{:>22}", format!("{} {} ({:.2}%)", c.name, c.count, c.normalized * 100.0)))
            .collect();
        println!("  {:<12} {}", muted(label), cells.join(" ").white());
    }
    println!();
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    estimators: &str,
    hyperparameters: Hyperparameters,
    seed: u64,
    train_fraction: f64,
    model_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let selection = EstimatorSelection::from_str(estimators)?;
    let mut request = TrainRequest::new(selection, hyperparameters).with_seed(seed);
    request.preprocessing.train_fraction = train_fraction;
    let store = store_for(model_path);

    let df = load_table(data_path)?;

    let names: Vec<&str> = request.selection.resolve().iter().map(|k| k.display_name()).collect();
    step_run(&format!("Training {}", names.join(" + ").cyan()));
    let outcome = train_action(&df, &request, &store)?;
    step_done(&format!("{:.2}s", outcome.elapsed_secs));

    step_ok(&format!(
        "{} train / {} test rows, {} features",
        outcome.n_train, outcome.n_test, outcome.n_features
    ));
    step_ok(&format!("Model saved → {}", outcome.model_path.display()));

    print_report(&outcome.report);
    Ok(())
}

pub fn cmd_predict(
    data_path: &Path,
    output: &Path,
    batch_scaling: bool,
    model_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    let store = store_for(model_path);
    let scaling = if batch_scaling {
        ScalingPolicy::BatchStatistics
    } else {
        ScalingPolicy::TrainingStatistics
    };

    let df = load_table(data_path)?;

    step_run("Classifying");
    let start = Instant::now();
    let outcome = predict_action(&df, &store, scaling)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    DataLoader::save_predictions(output, &outcome.labels)?;
    step_done(&format!("{} rows", outcome.labels.len()));

    println!();
    println!("  {:<14} {}", muted("CONFIRMED"), outcome.n_confirmed.to_string().white().bold());
    println!("  {:<14} {}", muted("CANDIDATE"), outcome.n_candidate.to_string().white().bold());
    println!();
    Ok(())
}

pub fn cmd_evaluate(data_path: &Path, model_path: Option<&Path>) -> anyhow::Result<()> {
    section("Evaluate");

    let store = store_for(model_path);
    let df = load_table(data_path)?;

    step_run("Scoring stored model");
    let start = Instant::now();
    let report = evaluate_action(&df, &store)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(path) = model_path {
        config = config.with_model_path(path);
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "ExoSeeker".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &format!("http://{}:{}", config.host, config.port)));
    line_box(&kv("API    ", &format!("http://{}:{}/api", config.host, config.port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", config.host, config.port)));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}
