//! Decision trees over sparse non-negative features
//!
//! One grower serves both ensembles. What a node optimizes is supplied by a
//! [`Criterion`]: class counts and Gini gain for the forest, gradient and
//! hessian sums for boosting.
//!
//! Split search gathers only the non-zero entries of the node's rows. Absent
//! (zero) entries form one group whose side is learned per split: one sweep
//! keeps the zero group on the left and the other keeps it on the right, and
//! the winning placement is stored as `default_left`. A row with `x[f] == 0`
//! follows `default_left`; a present value goes left when `x[f] <= threshold`.
//! When every row at a node carries the feature there is nothing to learn and
//! zeros go left.

use crate::sparse::{FeatureMatrix, SparseVector};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Gains at or below this do not split
const MIN_GAIN: f64 = 1e-9;

/// Node statistics and the objective a split maximizes
pub trait Criterion: Sync {
    type Stats: Clone + Send;

    fn empty(&self) -> Self::Stats;
    fn add(&self, stats: &mut Self::Stats, sample: usize);
    /// `total - part`
    fn subtract(&self, total: &Self::Stats, part: &Self::Stats) -> Self::Stats;
    /// Weight compared against the minimum split/leaf sizes
    fn count(&self, stats: &Self::Stats) -> f64;
    /// Split gain is `score(left) + score(right) - score(parent)`
    fn score(&self, stats: &Self::Stats) -> f64;
    fn leaf(&self, stats: &Self::Stats) -> Vec<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: f64,
    pub min_samples_leaf: f64,
    /// Features drawn per node; `None` considers all
    pub max_features: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: Vec<f32>,
    },
    Split {
        feature: u32,
        threshold: f32,
        /// Side taken by rows where the feature is absent
        default_left: bool,
        left: u32,
        right: u32,
    },
}

/// Routing shared by training and prediction
fn goes_left(value: f32, threshold: f32, default_left: bool) -> bool {
    if value == 0.0 {
        default_left
    } else {
        value <= threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices into `x`)
    pub fn grow<C: Criterion>(
        criterion: &C,
        x: &FeatureMatrix,
        samples: Vec<usize>,
        params: &TreeParams,
    ) -> Self {
        let mut grower = Grower {
            criterion,
            x,
            params,
            rng: StdRng::seed_from_u64(params.seed),
            candidate: vec![false; x.n_features],
            nodes: Vec::new(),
        };
        grower.build(samples, 0);
        DecisionTree {
            nodes: grower.nodes,
        }
    }

    /// Leaf value reached by `row`
    pub fn predict(&self, row: &SparseVector) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    idx = if goes_left(row.get(*feature as usize), *threshold, *default_left) {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[idx] {
                stack.push((*left as usize, depth + 1));
                stack.push((*right as usize, depth + 1));
            }
        }
        max_depth
    }
}

struct SplitChoice {
    gain: f64,
    feature: usize,
    threshold: f32,
    default_left: bool,
}

struct Grower<'a, C: Criterion> {
    criterion: &'a C,
    x: &'a FeatureMatrix,
    params: &'a TreeParams,
    rng: StdRng,
    candidate: Vec<bool>,
    nodes: Vec<Node>,
}

impl<'a, C: Criterion> Grower<'a, C> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> u32 {
        let mut total = self.criterion.empty();
        for &s in &samples {
            self.criterion.add(&mut total, s);
        }

        let id = self.nodes.len() as u32;
        self.nodes.push(Node::Leaf {
            value: self.criterion.leaf(&total),
        });

        let weight = self.criterion.count(&total);
        if depth >= self.params.max_depth
            || weight < self.params.min_samples_split
            || weight < 2.0 * self.params.min_samples_leaf
        {
            return id;
        }

        let Some(choice) = self.best_split(&samples, &total) else {
            return id;
        };

        let rows = &self.x.rows;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| {
                goes_left(rows[s].get(choice.feature), choice.threshold, choice.default_left)
            });
        if left.is_empty() || right.is_empty() {
            return id;
        }

        let left_id = self.build(left, depth + 1);
        let right_id = self.build(right, depth + 1);
        self.nodes[id as usize] = Node::Split {
            feature: choice.feature as u32,
            threshold: choice.threshold,
            default_left: choice.default_left,
            left: left_id,
            right: right_id,
        };
        id
    }

    fn draw_candidates(&mut self) -> bool {
        let n_features = self.x.n_features;
        match self.params.max_features {
            Some(k) if k < n_features => {
                self.candidate.fill(false);
                for f in index::sample(&mut self.rng, n_features, k) {
                    self.candidate[f] = true;
                }
                true
            }
            _ => false,
        }
    }

    /// Best split over the drawn features. When none of them separates the
    /// node, every feature is tried before giving up.
    fn best_split(&mut self, samples: &[usize], total: &C::Stats) -> Option<SplitChoice> {
        let restricted = self.draw_candidates();
        match self.scan(samples, total, restricted) {
            None if restricted => self.scan(samples, total, false),
            found => found,
        }
    }

    fn scan(&self, samples: &[usize], total: &C::Stats, restricted: bool) -> Option<SplitChoice> {
        // (feature, value, sample) for every non-zero candidate entry
        let mut entries: Vec<(u32, f32, u32)> = Vec::new();
        for &s in samples {
            for (f, v) in self.x.rows[s].iter() {
                if !restricted || self.candidate[f] {
                    entries.push((f as u32, v, s as u32));
                }
            }
        }
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let criterion = self.criterion;
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = criterion.score(total);
        let mut best: Option<SplitChoice> = None;

        let mut consider = |left: &C::Stats, feature: usize, threshold: f32, default_left: bool| {
            let right = criterion.subtract(total, left);
            if criterion.count(left) < min_leaf || criterion.count(&right) < min_leaf {
                return;
            }
            let gain = criterion.score(left) + criterion.score(&right) - parent_score;
            let floor = best.as_ref().map_or(MIN_GAIN, |b| b.gain);
            if gain > floor {
                best = Some(SplitChoice {
                    gain,
                    feature,
                    threshold,
                    default_left,
                });
            }
        };

        let mut start = 0;
        while start < entries.len() {
            let feature = entries[start].0;
            let mut end = start;
            while end < entries.len() && entries[end].0 == feature {
                end += 1;
            }
            let group = &entries[start..end];
            start = end;

            let feature = feature as usize;
            let has_zeros = group.len() < samples.len();

            // Zero group on the left
            let mut nonzero = criterion.empty();
            for e in group {
                criterion.add(&mut nonzero, e.2 as usize);
            }
            let mut left = criterion.subtract(total, &nonzero);
            if has_zeros {
                consider(&left, feature, midpoint(0.0, group[0].1), true);
            }
            for pair in group.windows(2) {
                criterion.add(&mut left, pair[0].2 as usize);
                if pair[0].1 < pair[1].1 {
                    consider(&left, feature, midpoint(pair[0].1, pair[1].1), true);
                }
            }

            // Zero group on the right. "All present values left" is the
            // mirror of the first split above, so it is not repeated.
            if has_zeros {
                let mut left = criterion.empty();
                for pair in group.windows(2) {
                    criterion.add(&mut left, pair[0].2 as usize);
                    if pair[0].1 < pair[1].1 {
                        consider(&left, feature, midpoint(pair[0].1, pair[1].1), false);
                    }
                }
            }
        }

        best
    }
}

/// Threshold strictly below `hi` that keeps `lo` on the left
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}

/// Gini impurity over weighted class counts
pub struct Gini<'a> {
    targets: &'a [usize],
    weights: &'a [f32],
    n_classes: usize,
}

impl<'a> Gini<'a> {
    /// `targets` are class positions in `0..n_classes`; `weights` are
    /// per-row multiplicities
    pub fn new(targets: &'a [usize], weights: &'a [f32], n_classes: usize) -> Self {
        Self {
            targets,
            weights,
            n_classes,
        }
    }
}

impl Criterion for Gini<'_> {
    type Stats = Vec<f64>;

    fn empty(&self) -> Vec<f64> {
        vec![0.0; self.n_classes]
    }

    fn add(&self, stats: &mut Vec<f64>, sample: usize) {
        stats[self.targets[sample]] += f64::from(self.weights[sample]);
    }

    fn subtract(&self, total: &Vec<f64>, part: &Vec<f64>) -> Vec<f64> {
        total.iter().zip(part).map(|(t, p)| (t - p).max(0.0)).collect()
    }

    fn count(&self, stats: &Vec<f64>) -> f64 {
        stats.iter().sum()
    }

    /// Minimizing weighted child impurity `W - sum(c^2)/W` is maximizing
    /// `sum(c^2)/W`
    fn score(&self, stats: &Vec<f64>) -> f64 {
        let weight: f64 = stats.iter().sum();
        if weight <= 0.0 {
            return 0.0;
        }
        stats.iter().map(|c| c * c).sum::<f64>() / weight
    }

    fn leaf(&self, stats: &Vec<f64>) -> Vec<f32> {
        let weight: f64 = stats.iter().sum();
        if weight <= 0.0 {
            return vec![0.0; stats.len()];
        }
        stats.iter().map(|c| (c / weight) as f32).collect()
    }
}
