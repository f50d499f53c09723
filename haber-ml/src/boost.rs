//! Softmax gradient boosting
//!
//! Each round fits one regression tree per class on the softmax gradients
//! (`p - y`) and hessians (`2p(1 - p)`) of the current margins. Leaves hold
//! the Newton step `-G / (H + lambda)`, shrunk by the learning rate.

use crate::dataset::{distinct_labels, encode_targets, Label};
use crate::pipeline::Estimator;
use crate::sparse::{FeatureMatrix, SparseVector};
use crate::svm::argmax;
use crate::tree::{Criterion, DecisionTree, TreeParams};
use haber_common::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f32,
    /// L2 regularization on leaf values
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            max_depth: 5,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

/// Newton-step criterion over per-row gradient/hessian pairs
struct GradientCriterion<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
    lambda: f64,
}

impl Criterion for GradientCriterion<'_> {
    type Stats = (f64, f64);

    fn empty(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn add(&self, stats: &mut (f64, f64), sample: usize) {
        stats.0 += self.grad[sample];
        stats.1 += self.hess[sample];
    }

    fn subtract(&self, total: &(f64, f64), part: &(f64, f64)) -> (f64, f64) {
        (total.0 - part.0, (total.1 - part.1).max(0.0))
    }

    fn count(&self, stats: &(f64, f64)) -> f64 {
        stats.1
    }

    fn score(&self, stats: &(f64, f64)) -> f64 {
        stats.0 * stats.0 / (stats.1 + self.lambda)
    }

    fn leaf(&self, stats: &(f64, f64)) -> Vec<f32> {
        vec![(-stats.0 / (stats.1 + self.lambda)) as f32]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    classes: Vec<Label>,
    learning_rate: f32,
    /// `rounds[r][k]` is round `r`'s tree for class `k`
    rounds: Vec<Vec<DecisionTree>>,
}

impl GradientBoosting {
    pub fn fit(x: &FeatureMatrix, y: &[Label], params: &BoostParams) -> Result<Self> {
        if x.n_rows() != y.len() || y.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        let classes = distinct_labels(y);
        if classes.len() < 2 {
            return Err(Error::InvalidInput(
                "gradient boosting needs at least two classes".into(),
            ));
        }

        let targets = encode_targets(y, &classes)?;
        let n = y.len();
        let n_classes = classes.len();
        let mut margins = vec![0.0f32; n * n_classes];
        let mut rounds = Vec::with_capacity(params.n_rounds);

        for round in 0..params.n_rounds {
            let probs: Vec<f64> = margins
                .par_chunks(n_classes)
                .flat_map_iter(softmax)
                .collect();

            let trees: Vec<DecisionTree> = (0..n_classes)
                .into_par_iter()
                .map(|k| {
                    let (grad, hess): (Vec<f64>, Vec<f64>) = (0..n)
                        .map(|i| {
                            let p = probs[i * n_classes + k];
                            let target = if targets[i] == k { 1.0 } else { 0.0 };
                            (p - target, (2.0 * p * (1.0 - p)).max(MIN_HESSIAN))
                        })
                        .unzip();
                    let criterion = GradientCriterion {
                        grad: &grad,
                        hess: &hess,
                        lambda: params.lambda,
                    };
                    let tree_params = TreeParams {
                        max_depth: params.max_depth,
                        min_samples_split: 0.0,
                        min_samples_leaf: params.min_child_weight,
                        max_features: None,
                        seed: params.seed.wrapping_add((round * n_classes + k) as u64),
                    };
                    DecisionTree::grow(&criterion, x, (0..n).collect(), &tree_params)
                })
                .collect();

            margins
                .par_chunks_mut(n_classes)
                .zip(x.rows.par_iter())
                .for_each(|(row_margins, row)| {
                    for (m, tree) in row_margins.iter_mut().zip(&trees) {
                        *m += params.learning_rate * tree.predict(row)[0];
                    }
                });

            if (round + 1) % 10 == 0 || round + 1 == params.n_rounds {
                debug!(
                    "Boosting round {}/{}: train mlogloss {:.4}",
                    round + 1,
                    params.n_rounds,
                    log_loss(&probs, &targets, n_classes)
                );
            }
            rounds.push(trees);
        }

        info!(
            "Gradient boosting fitted: {} rounds x {} classes",
            rounds.len(),
            n_classes
        );

        Ok(Self {
            classes,
            learning_rate: params.learning_rate,
            rounds,
        })
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn margins(&self, row: &SparseVector) -> Vec<f32> {
        let mut margins = vec![0.0f32; self.classes.len()];
        for trees in &self.rounds {
            for (m, tree) in margins.iter_mut().zip(trees) {
                *m += self.learning_rate * tree.predict(row)[0];
            }
        }
        margins
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f32> {
        softmax(&self.margins(row)).map(|p| p as f32).collect()
    }
}

impl Estimator for GradientBoosting {
    fn predict_row(&self, row: &SparseVector) -> Label {
        self.classes[argmax(&self.margins(row))]
    }
}

fn softmax(margins: &[f32]) -> impl Iterator<Item = f64> + '_ {
    let max = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let denom: f64 = margins.iter().map(|&m| f64::from(m - max).exp()).sum();
    margins
        .iter()
        .map(move |&m| f64::from(m - max).exp() / denom)
}

fn log_loss(probs: &[f64], targets: &[usize], n_classes: usize) -> f64 {
    let total: f64 = targets
        .iter()
        .enumerate()
        .map(|(i, &k)| -probs[i * n_classes + k].max(1e-15).ln())
        .sum();
    total / targets.len().max(1) as f64
}
