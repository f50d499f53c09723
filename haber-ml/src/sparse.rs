//! Sparse feature rows

use serde::{Deserialize, Serialize};

/// Sparse row with strictly increasing column indices and no stored zeros
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unordered `(column, value)` pairs. Duplicate columns are
    /// summed and zeros dropped.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_unstable_by_key(|&(idx, _)| idx);

        let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (idx, value) in pairs {
            match indices.last() {
                Some(&last) if last == idx => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    indices.push(idx);
                    values.push(value);
                }
            }
        }

        let mut row = Self { indices, values };
        row.prune_zeros();
        row
    }

    fn prune_zeros(&mut self) {
        if self.values.iter().all(|&v| v != 0.0) {
            return;
        }
        let (indices, values) = self
            .indices
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| **v != 0.0)
            .map(|(&i, &v)| (i, v))
            .unzip();
        self.indices = indices;
        self.values = values;
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| (i as usize, v))
    }

    /// Value at `column`, zero when absent
    pub fn get(&self, column: usize) -> f32 {
        match self.indices.binary_search(&(column as u32)) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product with a dense weight vector; columns past its end count as zero
    pub fn dot(&self, weights: &[f32]) -> f32 {
        self.iter()
            .filter_map(|(i, v)| weights.get(i).map(|w| w * v))
            .sum()
    }

    pub fn squared_norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// Scale to unit L2 norm; the zero vector stays zero
    pub fn normalize(&mut self) {
        let norm = self.squared_norm().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

/// Row-major sparse matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<SparseVector>,
    pub n_features: usize,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<SparseVector>, n_features: usize) -> Self {
        Self { rows, n_features }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Copy of the given rows, in the given order
    pub fn select(&self, row_indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            rows: row_indices.iter().map(|&i| self.rows[i].clone()).collect(),
            n_features: self.n_features,
        }
    }
}
