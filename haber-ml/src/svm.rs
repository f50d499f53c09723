//! Linear SVM
//!
//! One-vs-rest over the label set. Each binary problem is solved in the dual
//! by coordinate descent (hinge loss, box constraint `C_i`), with a constant
//! bias feature appended to every row.

use crate::dataset::{class_distribution, distinct_labels, encode_targets, Label};
use crate::pipeline::Estimator;
use crate::sparse::{FeatureMatrix, SparseVector};
use haber_common::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    pub c: f64,
    /// Stop once the projected-gradient spread falls below this
    pub tol: f64,
    pub max_iter: usize,
    /// Scale `C` per class by `n / (k * n_class)`
    pub balanced: bool,
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            tol: 0.1,
            max_iter: 1000,
            balanced: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    classes: Vec<Label>,
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
}

impl LinearSvm {
    pub fn fit(x: &FeatureMatrix, y: &[Label], params: &SvmParams) -> Result<Self> {
        if x.n_rows() != y.len() {
            return Err(Error::InvalidInput(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        let classes = distinct_labels(y);
        if classes.len() < 2 {
            return Err(Error::InvalidInput(
                "linear SVM needs at least two classes".into(),
            ));
        }

        let class_weight = class_weights(y, &classes, params.balanced);
        let sample_c: Vec<f64> = encode_targets(y, &classes)?
            .into_iter()
            .map(|pos| params.c * class_weight[pos])
            .collect();
        // ||x||^2 plus the bias feature
        let diag: Vec<f64> = x
            .rows
            .iter()
            .map(|r| f64::from(r.squared_norm()) + 1.0)
            .collect();

        let solved: Vec<(Vec<f32>, f32)> = classes
            .par_iter()
            .enumerate()
            .map(|(k, &positive)| {
                let signs: Vec<f64> = y
                    .iter()
                    .map(|&l| if l == positive { 1.0 } else { -1.0 })
                    .collect();
                solve_binary(x, &signs, &sample_c, &diag, params, params.seed + k as u64)
            })
            .collect();

        let (weights, biases) = solved.into_iter().unzip();
        info!(
            "Linear SVM fitted: {} classes, {} features, {} rows",
            classes.len(),
            x.n_features,
            x.n_rows()
        );

        Ok(Self {
            classes,
            weights,
            biases,
        })
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    /// One margin per class, in [`Self::classes`] order
    pub fn decision_function(&self, row: &SparseVector) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| row.dot(w) + b)
            .collect()
    }
}

impl Estimator for LinearSvm {
    fn predict_row(&self, row: &SparseVector) -> Label {
        let scores = self.decision_function(row);
        self.classes[argmax(&scores)]
    }
}

/// First index of the largest value
pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn class_weights(y: &[Label], classes: &[Label], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; classes.len()];
    }
    let counts = class_distribution(y.iter().copied());
    let n = y.len() as f64;
    let k = classes.len() as f64;
    classes
        .iter()
        .map(|c| n / (k * counts.get(c).copied().unwrap_or(1) as f64))
        .collect()
}

/// Dual coordinate descent for one binary hinge-loss problem
fn solve_binary(
    x: &FeatureMatrix,
    signs: &[f64],
    upper: &[f64],
    diag: &[f64],
    params: &SvmParams,
    seed: u64,
) -> (Vec<f32>, f32) {
    let n = x.n_rows();
    let mut w = vec![0.0f64; x.n_features];
    let mut bias = 0.0f64;
    let mut alpha = vec![0.0f64; n];
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut iterations = 0;

    while iterations < params.max_iter {
        iterations += 1;
        order.shuffle(&mut rng);
        let mut pg_max = f64::NEG_INFINITY;
        let mut pg_min = f64::INFINITY;

        for &i in &order {
            let row = &x.rows[i];
            let margin: f64 = row.iter().map(|(f, v)| w[f] * f64::from(v)).sum::<f64>() + bias;
            let g = signs[i] * margin - 1.0;

            let pg = if alpha[i] <= 0.0 {
                g.min(0.0)
            } else if alpha[i] >= upper[i] {
                g.max(0.0)
            } else {
                g
            };
            pg_max = pg_max.max(pg);
            pg_min = pg_min.min(pg);

            if pg.abs() > 1e-12 {
                let old = alpha[i];
                alpha[i] = (old - g / diag[i]).clamp(0.0, upper[i]);
                let step = (alpha[i] - old) * signs[i];
                for (f, v) in row.iter() {
                    w[f] += step * f64::from(v);
                }
                bias += step;
            }
        }

        if pg_max - pg_min <= params.tol {
            break;
        }
    }

    debug!("Binary SVM converged after {} passes", iterations);
    (w.into_iter().map(|v| v as f32).collect(), bias as f32)
}
