//! End-to-end tests for the text classification pipeline
//!
//! Tests cover:
//! - Clean -> split -> vectorize -> fit -> evaluate for each classifier
//! - Oversampled training partitions
//! - Artifact save/load keeps predictions
//! - Short keyword-only queries reach their topic

use haber_ml::boost::{BoostParams, GradientBoosting};
use haber_ml::forest::{ForestParams, RandomForest};
use haber_ml::resample::oversample;
use haber_ml::split::stratified_split;
use haber_ml::svm::{LinearSvm, SvmParams};
use haber_ml::{
    ClassificationReport, ClassifierModel, Estimator, Label, TextCleaner, TfidfConfig,
    TfidfVectorizer, TrainedPipeline, Variant,
};
use tempfile::TempDir;

const TOPICS: [(Label, &[&str]); 3] = [
    (
        0,
        &["borsa", "rekor", "yükseliş", "kazanç", "yatırım", "büyüme"],
    ),
    (
        4,
        &["trafik", "kaza", "yaralı", "gecikme", "sıkışıklık", "ceza"],
    ),
    (
        10,
        &["deprem", "yıkım", "enkaz", "kayıp", "felaket", "tahribat"],
    ),
];

/// Separable corpus with unbalanced classes. Apart from stop-words and
/// digits, which cleaning removes, every token belongs to one topic.
fn corpus() -> (Vec<String>, Vec<Label>) {
    let cleaner = TextCleaner::training(true);
    let mut docs = Vec::new();
    let mut labels = Vec::new();
    for (class_idx, (label, words)) in TOPICS.iter().enumerate() {
        let count = 20 + class_idx * 10;
        for i in 0..count {
            let text = format!(
                "{}. {} ve {}, hem de {} için!",
                i,
                words[i % words.len()],
                words[(i + 1) % words.len()],
                words[(i + 3) % words.len()],
            );
            docs.push(cleaner.clean(&text));
            labels.push(*label);
        }
    }
    (docs, labels)
}

fn take<T: Clone>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i].clone()).collect()
}

#[test]
fn test_each_classifier_learns_a_separable_corpus() {
    let (docs, labels) = corpus();
    let partition = stratified_split(&labels, 0.2, 42).unwrap();
    let train_docs = take(&docs, &partition.train);
    let train_labels = take(&labels, &partition.train);
    let test_docs = take(&docs, &partition.test);
    let test_labels = take(&labels, &partition.test);

    let (vectorizer, x_train) =
        TfidfVectorizer::fit_transform(TfidfConfig::new(1000, (1, 2)), &train_docs).unwrap();
    let x_test = vectorizer.transform(&test_docs);

    let models: Vec<(&str, ClassifierModel)> = vec![
        (
            "svm",
            ClassifierModel::LinearSvm(
                LinearSvm::fit(&x_train, &train_labels, &SvmParams::default()).unwrap(),
            ),
        ),
        (
            "forest",
            ClassifierModel::RandomForest(
                RandomForest::fit(
                    &x_train,
                    &train_labels,
                    &ForestParams {
                        n_estimators: 30,
                        ..ForestParams::default()
                    },
                )
                .unwrap(),
            ),
        ),
        (
            "boost",
            ClassifierModel::GradientBoosting(
                GradientBoosting::fit(
                    &x_train,
                    &train_labels,
                    &BoostParams {
                        n_rounds: 30,
                        ..BoostParams::default()
                    },
                )
                .unwrap(),
            ),
        ),
    ];

    for (name, model) in models {
        let predicted = model.predict(&x_test);
        let report = ClassificationReport::compute(&test_labels, &predicted).unwrap();
        assert!(
            report.accuracy >= 0.9,
            "{} accuracy {:.3}\n{}",
            name,
            report.accuracy,
            report
        );
    }
}

#[test]
fn test_oversampled_training_partition_is_balanced() {
    let (docs, labels) = corpus();
    let partition = stratified_split(&labels, 0.2, 42).unwrap();
    let train_labels = take(&labels, &partition.train);

    let rows = oversample(&train_labels, 40, 42).unwrap();
    let resampled: Vec<Label> = rows.iter().map(|&i| train_labels[i]).collect();

    assert_eq!(resampled.len(), 120);
    for (label, _) in TOPICS {
        assert_eq!(resampled.iter().filter(|&&l| l == label).count(), 40);
    }
    // Indices refer to the training partition only
    assert!(rows.iter().all(|&i| i < partition.train.len()));
    assert!(docs.len() > partition.train.len());
}

#[test]
fn test_saved_pipeline_predicts_like_the_original() {
    let (docs, labels) = corpus();
    let (vectorizer, x) =
        TfidfVectorizer::fit_transform(TfidfConfig::new(3000, (1, 1)), &docs).unwrap();
    let model = GradientBoosting::fit(
        &x,
        &labels,
        &BoostParams {
            n_rounds: 10,
            ..BoostParams::default()
        },
    )
    .unwrap();
    let pipeline = TrainedPipeline::new(
        Variant::Boost,
        TextCleaner::training(true),
        vectorizer,
        ClassifierModel::GradientBoosting(model),
        vec![0, 4, 10],
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join(Variant::Boost.artifact_file_name());
    pipeline.save(&path).unwrap();
    let loaded = TrainedPipeline::load(&path).unwrap();

    assert_eq!(
        loaded.predict_cleaned_batch(&docs),
        pipeline.predict_cleaned_batch(&docs)
    );
    assert_eq!(loaded.predict("Deprem sonrası enkaz kaldırıldı"), 10);
}

#[test]
fn test_boosting_routes_short_keyword_queries() {
    let (docs, labels) = corpus();
    let cleaner = TextCleaner::training(true);
    let (vectorizer, x) =
        TfidfVectorizer::fit_transform(TfidfConfig::new(3000, (1, 1)), &docs).unwrap();
    let model = GradientBoosting::fit(
        &x,
        &labels,
        &BoostParams {
            n_rounds: 30,
            ..BoostParams::default()
        },
    )
    .unwrap();

    let queries = [
        ("Borsa rekor", 0),
        ("Trafik kaza", 4),
        ("Deprem sonrası enkaz kaldırıldı", 10),
    ];
    for (query, expected) in queries {
        let row = vectorizer.transform_one(&cleaner.clean(query));
        assert_eq!(model.predict_row(&row), expected, "query {:?}", query);
    }
}
