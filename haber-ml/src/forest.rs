//! Random forest classifier
//!
//! Bootstrap rows per tree (as multiplicity weights), Gini splits over
//! `sqrt(n_features)` features drawn per node, and class distributions
//! averaged across trees. Trees are grown in parallel; tree `i` is seeded
//! with `seed + i` so the result does not depend on scheduling.

use crate::dataset::{distinct_labels, encode_targets, Label};
use crate::pipeline::Estimator;
use crate::sparse::{FeatureMatrix, SparseVector};
use crate::svm::argmax;
use crate::tree::{DecisionTree, Gini, TreeParams};
use haber_common::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 20,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<Label>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(x: &FeatureMatrix, y: &[Label], params: &ForestParams) -> Result<Self> {
        if x.n_rows() != y.len() || y.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(Error::InvalidInput("n_estimators must be positive".into()));
        }

        let classes = distinct_labels(y);
        let targets = encode_targets(y, &classes)?;
        let n = y.len();
        let candidates = ((x.n_features as f64).sqrt() as usize).max(1);

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let mut weights = vec![0.0f32; n];
                for _ in 0..n {
                    weights[rng.gen_range(0..n)] += 1.0;
                }
                let samples: Vec<usize> = (0..n).filter(|&s| weights[s] > 0.0).collect();

                let gini = Gini::new(&targets, &weights, classes.len());
                let tree_params = TreeParams {
                    max_depth: params.max_depth,
                    min_samples_split: params.min_samples_split as f64,
                    min_samples_leaf: params.min_samples_leaf as f64,
                    max_features: Some(candidates),
                    seed: rng.gen(),
                };
                DecisionTree::grow(&gini, x, samples, &tree_params)
            })
            .collect();

        debug!(
            "Random forest fitted: {} trees, {} candidate features per split",
            trees.len(),
            candidates
        );

        Ok(Self { classes, trees })
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' leaf class distributions
    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f32> {
        let mut proba = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.predict(row)) {
                *p += v;
            }
        }
        let n_trees = self.trees.len().max(1) as f32;
        for p in &mut proba {
            *p /= n_trees;
        }
        proba
    }
}

impl Estimator for RandomForest {
    fn predict_row(&self, row: &SparseVector) -> Label {
        self.classes[argmax(&self.predict_proba(row))]
    }
}
