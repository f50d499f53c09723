//! haber-train - Main entry point
//!
//! Trains one classifier variant and writes its artifact:
//! - `svm`: TF-IDF (1-2 grams) + balanced linear SVM
//! - `forest`: grid-searched TF-IDF + random forest
//! - `boost`: oversampled TF-IDF (unigrams) + gradient boosting, with report

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haber_common::config::load_config;
use haber_ml::Variant;
use haber_train::run_variant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for haber-train
#[derive(Parser, Debug)]
#[command(name = "haber-train")]
#[command(about = "Train Turkish news stance classifiers")]
#[command(version)]
struct Cli {
    /// Config file (overrides HABER_CONFIG and discovered files)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Newline-delimited JSON source
    #[arg(long, global = true)]
    lines_source: Option<PathBuf>,

    /// JSON array source
    #[arg(long, global = true)]
    array_source: Option<PathBuf>,

    /// Directory for the model artifact and report
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Rows per class after oversampling (boost)
    #[arg(long, global = true)]
    target_count: Option<usize>,

    /// Seed for splitting, sampling and model fitting
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Also write the performance report for svm and forest
    #[arg(long, global = true)]
    write_report: bool,

    /// Export the cleaned dataset as JSON lines
    #[arg(long, global = true, value_name = "FILE")]
    export_cleaned: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Linear SVM with balanced class weights
    Svm,
    /// Random forest tuned by cross-validated grid search
    Forest,
    /// Gradient boosting on an oversampled training partition
    Boost,
}

impl From<Commands> for Variant {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Svm => Variant::Svm,
            Commands::Forest => Variant::Forest,
            Commands::Boost => Variant::Boost,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let training = &mut config.training;
    if let Some(path) = cli.lines_source {
        training.lines_source = path;
    }
    if let Some(path) = cli.array_source {
        training.array_source = path;
    }
    if let Some(dir) = cli.output_dir {
        training.output_dir = dir;
    }
    if let Some(count) = cli.target_count {
        training.target_count = count;
    }
    if let Some(seed) = cli.seed {
        training.seed = seed;
    }
    if cli.write_report {
        training.write_report = true;
    }
    if cli.export_cleaned.is_some() {
        training.export_cleaned = cli.export_cleaned;
    }

    let variant = Variant::from(cli.command);
    let outcome = run_variant(variant, training)
        .with_context(|| format!("Training variant '{}' failed", variant))?;

    info!(
        "Loaded {} records ({} rejected); trained on {}, tested on {}",
        outcome.loaded, outcome.rejected, outcome.train_rows, outcome.test_rows
    );
    info!("Model saved: {}", outcome.artifact_path.display());
    if let Some(path) = &outcome.report_path {
        info!("Report saved: {}", path.display());
    }
    info!("Weighted F1 (test set): {:.4}", outcome.report.weighted_f1());

    Ok(())
}
