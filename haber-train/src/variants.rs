//! Training variants
//!
//! All three variants share one shape:
//! load -> clean -> stratified split -> fit -> evaluate -> save -> verify.
//! They differ in cleaner settings, vectorizer settings, the classifier,
//! and whether the training partition is oversampled first.

use crate::report::{render_report, report_file_name, write_report};
use haber_common::config::TrainingConfig;
use haber_common::{Error, Result};
use haber_ml::boost::{BoostParams, GradientBoosting};
use haber_ml::dataset::{
    class_distribution, distinct_labels, load_sources, write_cleaned_jsonl, LabeledRecord,
};
use haber_ml::grid::grid_search_forest;
use haber_ml::metrics::{confusion_matrix, label_union};
use haber_ml::resample::oversample;
use haber_ml::split::stratified_split;
use haber_ml::svm::{LinearSvm, SvmParams};
use haber_ml::{
    ClassificationReport, ClassifierModel, DataSource, Label, TextCleaner, TfidfConfig,
    TfidfVectorizer, TrainedPipeline, Variant,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Rows cleaned per progress step
pub const CLEAN_CHUNK_SIZE: usize = 10_000;

/// Per-variant preprocessing and output settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSettings {
    pub cleaner: TextCleaner,
    /// Fixed vectorizer settings; `None` when grid search picks them
    pub tfidf: Option<TfidfConfig>,
    /// Rebalance the training partition to `target_count` rows per class
    pub oversample: bool,
    /// Write the performance report even when `write_report` is off
    pub always_report: bool,
}

impl VariantSettings {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Svm => Self {
                cleaner: TextCleaner::training(false),
                tfidf: Some(TfidfConfig::new(10_000, (1, 2))),
                oversample: false,
                always_report: false,
            },
            Variant::Forest => Self {
                cleaner: TextCleaner::training(false),
                tfidf: None,
                oversample: false,
                always_report: false,
            },
            Variant::Boost => Self {
                cleaner: TextCleaner::training(true),
                tfidf: Some(TfidfConfig::new(3_000, (1, 1))),
                oversample: true,
                always_report: true,
            },
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub variant: Variant,
    pub artifact_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub report: ClassificationReport,
    pub loaded: usize,
    pub rejected: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

fn log_distribution(stage: &str, distribution: &BTreeMap<Label, usize>) {
    let summary = distribution
        .iter()
        .map(|(label, count)| format!("{}={}", label, count))
        .collect::<Vec<_>>()
        .join(" ");
    info!("{} class distribution: {}", stage, summary);
}

/// Clean in chunks, parallel within a chunk, logging progress per chunk
fn clean_records(records: &[LabeledRecord], cleaner: &TextCleaner) -> Vec<LabeledRecord> {
    let total = records.len();
    let mut cleaned = Vec::with_capacity(total);

    for chunk in records.chunks(CLEAN_CHUNK_SIZE) {
        cleaned.par_extend(chunk.par_iter().map(|r| LabeledRecord {
            text: cleaner.clean(&r.text),
            label: r.label,
        }));
        info!("Cleaned {}/{} records", cleaned.len(), total);
    }

    cleaned
}

fn gather<T: Clone>(items: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| items[i].clone()).collect()
}

/// Fit the variant's vectorizer and classifier on the training partition
fn fit_variant(
    variant: Variant,
    settings: &VariantSettings,
    config: &TrainingConfig,
    docs: &[String],
    labels: &[Label],
) -> Result<(TfidfVectorizer, ClassifierModel)> {
    match (variant, settings.tfidf) {
        (Variant::Forest, _) => {
            let outcome =
                grid_search_forest(docs, labels, &config.forest_grid, config.cv_folds, config.seed)?;
            let (vectorizer, forest) = outcome.refit(docs, labels)?;
            Ok((vectorizer, ClassifierModel::RandomForest(forest)))
        }
        (Variant::Svm, Some(tfidf)) => {
            let (vectorizer, x) = TfidfVectorizer::fit_transform(tfidf, docs)?;
            let params = SvmParams {
                seed: config.seed,
                ..SvmParams::default()
            };
            let model = LinearSvm::fit(&x, labels, &params)?;
            Ok((vectorizer, ClassifierModel::LinearSvm(model)))
        }
        (Variant::Boost, Some(tfidf)) => {
            let (vectorizer, x) = TfidfVectorizer::fit_transform(tfidf, docs)?;
            let params = BoostParams {
                seed: config.seed,
                ..BoostParams::default()
            };
            let model = GradientBoosting::fit(&x, labels, &params)?;
            Ok((vectorizer, ClassifierModel::GradientBoosting(model)))
        }
        (_, None) => Err(Error::Internal(format!(
            "variant {} has no vectorizer settings",
            variant
        ))),
    }
}

/// Run one training variant end to end
pub fn run_variant(variant: Variant, config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    let started = Instant::now();
    let settings = VariantSettings::for_variant(variant);
    info!("Training variant '{}'", variant);

    let sources = [
        DataSource::json_lines(&config.lines_source),
        DataSource::json_array(&config.array_source),
    ];
    let loaded = load_sources(&sources)?;
    if loaded.records.is_empty() {
        return Err(Error::InvalidInput(
            "no usable records in the training sources".into(),
        ));
    }
    log_distribution("Loaded", &loaded.class_distribution());

    let cleaned = clean_records(&loaded.records, &settings.cleaner);
    if let Some(path) = &config.export_cleaned {
        write_cleaned_jsonl(path, &cleaned)?;
    }

    let (docs, labels): (Vec<String>, Vec<Label>) =
        cleaned.into_iter().map(|r| (r.text, r.label)).unzip();

    let partition = stratified_split(&labels, config.test_size, config.seed)?;
    let mut train_docs = gather(&docs, &partition.train);
    let mut train_labels = gather(&labels, &partition.train);
    let test_docs = gather(&docs, &partition.test);
    let test_labels = gather(&labels, &partition.test);
    info!(
        "Split: {} train / {} test rows",
        train_docs.len(),
        test_docs.len()
    );

    if settings.oversample {
        let rows = oversample(&train_labels, config.target_count, config.seed)?;
        train_docs = gather(&train_docs, &rows);
        train_labels = gather(&train_labels, &rows);
        log_distribution(
            "Oversampled",
            &class_distribution(train_labels.iter().copied()),
        );
    }

    let (vectorizer, classifier) =
        fit_variant(variant, &settings, config, &train_docs, &train_labels)?;
    let pipeline = TrainedPipeline::new(
        variant,
        settings.cleaner,
        vectorizer,
        classifier,
        distinct_labels(&train_labels),
    );

    let predicted = pipeline.predict_cleaned_batch(&test_docs);
    let report = ClassificationReport::compute(&test_labels, &predicted)?;
    info!("Accuracy (test set): {:.4}", report.accuracy);
    info!("Classification report:\n{}", report);

    let artifact_path = config.output_dir.join(variant.artifact_file_name());
    pipeline.save(&artifact_path)?;

    let reloaded = TrainedPipeline::load(&artifact_path)?;
    if reloaded.predict_cleaned_batch(&test_docs) != predicted {
        return Err(Error::Internal(format!(
            "reloaded artifact {} predicts differently",
            artifact_path.display()
        )));
    }
    info!("Reloaded artifact reproduces test-set predictions");

    let report_path = if settings.always_report || config.write_report {
        let path = config.output_dir.join(report_file_name(variant));
        let labels_seen = label_union(&test_labels, &predicted);
        let text = render_report(
            &pipeline,
            &report,
            &confusion_matrix(&test_labels, &predicted, &labels_seen),
            &labels_seen,
        );
        write_report(&path, &text)?;
        Some(path)
    } else {
        None
    };

    info!(
        "Variant '{}' finished in {:.1}s",
        variant,
        started.elapsed().as_secs_f64()
    );

    Ok(TrainingOutcome {
        variant,
        artifact_path,
        report_path,
        report,
        loaded: loaded.records.len(),
        rejected: loaded.rejected.len(),
        train_rows: train_docs.len(),
        test_rows: test_docs.len(),
    })
}
