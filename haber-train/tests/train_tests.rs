//! Tests for the training variants
//!
//! Tests cover:
//! - Each variant writes a loadable artifact that classifies its topics
//! - Report written for boost always, for svm only when requested, one
//!   file per variant
//! - Oversampled boost training partition has target_count rows per class
//! - Cleaned dataset export
//! - Missing source is a hard error

use haber_common::config::{ForestGridConfig, TrainingConfig};
use haber_common::Error;
use haber_ml::{TrainedPipeline, Variant};
use haber_train::{report_file_name, run_variant};
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

const TOPICS: [(u8, [&str; 5]); 3] = [
    (0, ["borsa", "rekor", "yükseliş", "kazanç", "yatırım"]),
    (3, ["trafik", "kaza", "yaralı", "gecikme", "sıkışıklık"]),
    (9, ["deprem", "yıkım", "enkaz", "kayıp", "felaket"]),
];

/// Writes both sources (plus a few bad records) and returns a config
/// pointing at them
fn setup(dir: &TempDir) -> TrainingConfig {
    let mut lines = String::new();
    let mut array = Vec::new();

    for (label, words) in TOPICS {
        for i in 0..16 {
            let text = format!(
                "{} {} ve {} için {}.",
                words[i % 5],
                words[(i + 1) % 5],
                words[(i + 2) % 5],
                i
            );
            if i % 2 == 0 {
                let _ = writeln!(lines, "{{\"Body\": \"{}\", \"Durum\": {}}}", text, label);
            } else {
                array.push(format!("{{\"Body\": \"{}\", \"Durum\": \"{}\"}}", text, label));
            }
        }
    }
    lines.push_str("{\"Body\": \"etiket yok\"}\n");
    lines.push_str("{\"Body\": \"aralık dışı\", \"Durum\": 14}\n");

    let lines_path = dir.path().join("total.json");
    let array_path = dir.path().join("aa.json");
    fs::write(&lines_path, lines).unwrap();
    fs::write(&array_path, format!("[{}]", array.join(","))).unwrap();

    TrainingConfig {
        lines_source: lines_path,
        array_source: array_path,
        output_dir: dir.path().join("models"),
        target_count: 30,
        cv_folds: 2,
        forest_grid: ForestGridConfig {
            max_features: vec![100],
            ngram_range: vec![(1, 1)],
            n_estimators: vec![10],
            max_depth: vec![8],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        },
        ..TrainingConfig::default()
    }
}

#[test]
fn test_svm_variant_writes_artifact_without_report() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);

    let outcome = run_variant(Variant::Svm, &config).unwrap();

    assert_eq!(outcome.loaded, 48);
    assert_eq!(outcome.rejected, 2);
    assert_eq!(outcome.train_rows + outcome.test_rows, 48);
    assert!(outcome.report_path.is_none());
    assert!(!config
        .output_dir
        .join(report_file_name(Variant::Svm))
        .exists());

    let pipeline = TrainedPipeline::load(&outcome.artifact_path).unwrap();
    assert_eq!(pipeline.variant, Variant::Svm);
    assert_eq!(pipeline.labels, vec![0, 3, 9]);
    assert_eq!(pipeline.predict("Deprem sonrası enkaz ve kayıp"), 9);
}

#[test]
fn test_svm_report_when_requested() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig {
        write_report: true,
        ..setup(&dir)
    };

    let outcome = run_variant(Variant::Svm, &config).unwrap();

    let path = outcome.report_path.expect("report path");
    assert_eq!(path, config.output_dir.join("performance_report_svm.txt"));
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("Variant: svm"));
    assert!(text.contains("Accuracy (test set)"));
    assert!(text.contains("weighted avg"));
}

#[test]
fn test_boost_variant_oversamples_and_reports() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);

    let outcome = run_variant(Variant::Boost, &config).unwrap();

    assert_eq!(outcome.train_rows, 3 * 30);
    assert_eq!(
        outcome.artifact_path,
        config.output_dir.join("model_boost.json")
    );
    assert!(config
        .output_dir
        .join("performance_report_boost.txt")
        .exists());

    let pipeline = TrainedPipeline::load(&outcome.artifact_path).unwrap();
    assert!(pipeline.cleaner.strip_digits);
    assert_eq!(pipeline.predict("Borsa yeni rekor ile kazanç getirdi"), 0);
}

#[test]
fn test_forest_variant_uses_grid() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir);

    let outcome = run_variant(Variant::Forest, &config).unwrap();

    let pipeline = TrainedPipeline::load(&outcome.artifact_path).unwrap();
    assert_eq!(pipeline.vectorizer.config().max_features, Some(100));
    assert_eq!(pipeline.predict("Trafik kaza yaralı"), 3);
}

#[test]
fn test_exports_cleaned_dataset() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("cleaned.jsonl");
    let config = TrainingConfig {
        export_cleaned: Some(export.clone()),
        ..setup(&dir)
    };

    run_variant(Variant::Svm, &config).unwrap();

    let content = fs::read_to_string(export).unwrap();
    assert_eq!(content.lines().count(), 48);
    // Exported text is the cleaned text: no stop-words
    assert!(!content.contains(" ve "));
}

#[test]
fn test_missing_source_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig {
        array_source: dir.path().join("yok.json"),
        ..setup(&dir)
    };

    let result = run_variant(Variant::Svm, &config);
    assert!(matches!(result, Err(Error::SourceNotFound(_))));
    assert!(!config.output_dir.join("model_svm.json").exists());
}
