//! Fitted pipeline artifact
//!
//! A [`TrainedPipeline`] bundles the cleaner settings, the fitted vectorizer
//! and one fitted classifier. It is the only thing the training side hands
//! to the serving side, stored as a single JSON file.

use crate::boost::GradientBoosting;
use crate::dataset::Label;
use crate::forest::RandomForest;
use crate::sparse::{FeatureMatrix, SparseVector};
use crate::svm::LinearSvm;
use crate::text::TextCleaner;
use crate::tfidf::TfidfVectorizer;
use chrono::{DateTime, Utc};
use haber_common::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Bumped whenever the artifact layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 2;

/// A fitted classifier over sparse rows
pub trait Estimator: Send + Sync {
    fn predict_row(&self, row: &SparseVector) -> Label;

    fn predict(&self, x: &FeatureMatrix) -> Vec<Label> {
        x.rows.par_iter().map(|row| self.predict_row(row)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Svm,
    Forest,
    Boost,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Svm => "svm",
            Variant::Forest => "forest",
            Variant::Boost => "boost",
        }
    }

    /// File name of the variant's artifact inside the output directory
    pub fn artifact_file_name(&self) -> String {
        format!("model_{}.json", self.as_str())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    LinearSvm(LinearSvm),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Estimator for ClassifierModel {
    fn predict_row(&self, row: &SparseVector) -> Label {
        match self {
            ClassifierModel::LinearSvm(m) => m.predict_row(row),
            ClassifierModel::RandomForest(m) => m.predict_row(row),
            ClassifierModel::GradientBoosting(m) => m.predict_row(row),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPipeline {
    pub format_version: u32,
    pub variant: Variant,
    pub cleaner: TextCleaner,
    pub vectorizer: TfidfVectorizer,
    pub classifier: ClassifierModel,
    /// Labels seen in training, ascending
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
}

impl TrainedPipeline {
    pub fn new(
        variant: Variant,
        cleaner: TextCleaner,
        vectorizer: TfidfVectorizer,
        classifier: ClassifierModel,
        labels: Vec<Label>,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            variant,
            cleaner,
            vectorizer,
            classifier,
            labels,
            created_at: Utc::now(),
        }
    }

    /// Classify text that already went through [`Self::cleaner`]
    pub fn predict_cleaned(&self, cleaned: &str) -> Label {
        self.classifier
            .predict_row(&self.vectorizer.transform_one(cleaned))
    }

    /// Clean then classify raw text
    pub fn predict(&self, raw: &str) -> Label {
        self.predict_cleaned(&self.cleaner.clean(raw))
    }

    pub fn predict_cleaned_batch<S: AsRef<str> + Sync>(&self, cleaned: &[S]) -> Vec<Label> {
        self.classifier.predict(&self.vectorizer.transform(cleaned))
    }

    /// Write the artifact, replacing any previous file only once the new one
    /// is completely written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;

        info!(
            "Saved {} pipeline to {} ({} features)",
            self.variant,
            path.display(),
            self.vectorizer.n_features()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "model artifact {}",
                path.display()
            )));
        }

        let reader = BufReader::new(File::open(path)?);
        let pipeline: TrainedPipeline = serde_json::from_reader(reader)?;
        if pipeline.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::InvalidInput(format!(
                "artifact format version {} is not supported (expected {})",
                pipeline.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        info!(
            "Loaded {} pipeline from {} (trained {})",
            pipeline.variant,
            path.display(),
            pipeline.created_at
        );
        Ok(pipeline)
    }
}
