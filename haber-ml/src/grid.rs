//! Exhaustive grid search for the TF-IDF + random forest pipeline
//!
//! Every combination is scored by mean weighted F1 over stratified folds.
//! The vectorizer is fitted on each fold's training side only, and fitted
//! folds are shared by all forest settings with the same vectorizer
//! settings.

use crate::dataset::Label;
use crate::forest::{ForestParams, RandomForest};
use crate::metrics::ClassificationReport;
use crate::pipeline::Estimator;
use crate::sparse::FeatureMatrix;
use crate::split::stratified_folds;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};
use haber_common::config::ForestGridConfig;
use haber_common::{Error, Result};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub tfidf: TfidfConfig,
    pub forest: ForestParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridScore {
    pub point: GridPoint,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchOutcome {
    pub best: GridScore,
    /// Every combination, in grid order
    pub scores: Vec<GridScore>,
}

/// Vectorizer settings in grid order
fn tfidf_points(grid: &ForestGridConfig) -> Vec<TfidfConfig> {
    let mut points = Vec::new();
    for &max_features in &grid.max_features {
        for &ngram in &grid.ngram_range {
            points.push(TfidfConfig::new(max_features, ngram));
        }
    }
    points
}

/// Forest settings in grid order
fn forest_points(grid: &ForestGridConfig, seed: u64) -> Vec<ForestParams> {
    let mut points = Vec::new();
    for &n_estimators in &grid.n_estimators {
        for &max_depth in &grid.max_depth {
            for &min_samples_split in &grid.min_samples_split {
                for &min_samples_leaf in &grid.min_samples_leaf {
                    points.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                        min_samples_leaf,
                        seed,
                    });
                }
            }
        }
    }
    points
}

/// All combinations, vectorizer settings outermost
pub fn expand_grid(grid: &ForestGridConfig, seed: u64) -> Vec<GridPoint> {
    let forests = forest_points(grid, seed);
    tfidf_points(grid)
        .into_iter()
        .flat_map(|tfidf| {
            forests
                .iter()
                .map(move |&forest| GridPoint { tfidf, forest })
        })
        .collect()
}

struct FittedFold {
    train: FeatureMatrix,
    train_labels: Vec<Label>,
    validation: FeatureMatrix,
    validation_labels: Vec<Label>,
}

fn fit_folds(
    tfidf: TfidfConfig,
    docs: &[String],
    labels: &[Label],
    folds: &[crate::split::Partition],
) -> Result<Vec<FittedFold>> {
    folds
        .iter()
        .map(|fold| {
            let train_docs: Vec<&str> = fold.train.iter().map(|&i| docs[i].as_str()).collect();
            let validation_docs: Vec<&str> =
                fold.test.iter().map(|&i| docs[i].as_str()).collect();
            let (vectorizer, train) = TfidfVectorizer::fit_transform(tfidf, &train_docs)?;
            Ok(FittedFold {
                train,
                train_labels: fold.train.iter().map(|&i| labels[i]).collect(),
                validation: vectorizer.transform(&validation_docs),
                validation_labels: fold.test.iter().map(|&i| labels[i]).collect(),
            })
        })
        .collect()
}

/// Score every combination with `n_folds`-fold cross-validation.
///
/// The best combination is the highest mean score; ties keep the earlier
/// one in grid order.
pub fn grid_search_forest(
    docs: &[String],
    labels: &[Label],
    grid: &ForestGridConfig,
    n_folds: usize,
    seed: u64,
) -> Result<GridSearchOutcome> {
    if docs.len() != labels.len() {
        return Err(Error::InvalidInput(format!(
            "{} documents but {} labels",
            docs.len(),
            labels.len()
        )));
    }
    if grid.is_empty() {
        return Err(Error::InvalidInput("forest grid is empty".into()));
    }

    let folds = stratified_folds(labels, n_folds, seed)?;
    let forests = forest_points(grid, seed);
    let total = grid.len();
    info!(
        "Grid search: {} combinations x {} folds = {} fits",
        total,
        n_folds,
        total * n_folds
    );

    let mut scores: Vec<GridScore> = Vec::with_capacity(total);
    for tfidf in tfidf_points(grid) {
        let fitted = fit_folds(tfidf, docs, labels, &folds)?;
        debug!("Vectorized {} folds for {:?}", fitted.len(), tfidf);

        for &forest in &forests {
            let mut fold_scores = Vec::with_capacity(fitted.len());
            for fold in &fitted {
                let model = RandomForest::fit(&fold.train, &fold.train_labels, &forest)?;
                let predicted = model.predict(&fold.validation);
                let report = ClassificationReport::compute(&fold.validation_labels, &predicted)?;
                fold_scores.push(report.weighted_f1());
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;

            info!(
                "[{}/{}] {:?} {:?}: weighted F1 {:.4}",
                scores.len() + 1,
                total,
                tfidf,
                forest,
                mean_score
            );
            scores.push(GridScore {
                point: GridPoint { tfidf, forest },
                fold_scores,
                mean_score,
            });
        }
    }

    let best = scores
        .iter()
        .fold(None::<&GridScore>, |best, s| match best {
            Some(b) if b.mean_score >= s.mean_score => Some(b),
            _ => Some(s),
        })
        .cloned()
        .ok_or_else(|| Error::Internal("grid search produced no scores".into()))?;

    info!(
        "Best combination: {:?} {:?} (weighted F1 {:.4})",
        best.point.tfidf, best.point.forest, best.mean_score
    );

    Ok(GridSearchOutcome { best, scores })
}

impl GridSearchOutcome {
    /// Refit the winning combination on all of `docs`
    pub fn refit(&self, docs: &[String], labels: &[Label]) -> Result<(TfidfVectorizer, RandomForest)> {
        let (vectorizer, x) = TfidfVectorizer::fit_transform(self.best.point.tfidf, docs)?;
        let forest = RandomForest::fit(&x, labels, &self.best.point.forest)?;
        Ok((vectorizer, forest))
    }
}
