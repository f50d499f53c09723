//! # Haber ML
//!
//! Text classification building blocks for Turkish news stance scoring:
//! - Text cleaning and labeled dataset loading
//! - TF-IDF vectorization over sparse rows
//! - Stratified splitting, cross-validation folds and class oversampling
//! - Linear SVM, random forest and gradient-boosted tree classifiers
//! - Grid search, evaluation metrics and the serialized pipeline artifact

pub mod boost;
pub mod dataset;
pub mod forest;
pub mod grid;
pub mod metrics;
pub mod pipeline;
pub mod resample;
pub mod sparse;
pub mod split;
pub mod svm;
pub mod text;
pub mod tfidf;
pub mod tree;

pub use dataset::{DataSource, LabeledRecord, Label, LoadReport, SourceFormat};
pub use metrics::ClassificationReport;
pub use pipeline::{ClassifierModel, Estimator, TrainedPipeline, Variant};
pub use sparse::{FeatureMatrix, SparseVector};
pub use text::TextCleaner;
pub use tfidf::{TfidfConfig, TfidfVectorizer};
