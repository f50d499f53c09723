//! Classification metrics
//!
//! Per-class precision, recall, F1 and support over the union of true and
//! predicted labels, plus macro and support-weighted averages. A ratio with
//! a zero denominator is reported as 0.

use crate::dataset::Label;
use haber_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Fraction of positions where `y_pred` equals `y_true`
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

/// Sorted union of labels seen in either vector
pub fn label_union(y_true: &[Label], y_pred: &[Label]) -> Vec<Label> {
    y_true
        .iter()
        .chain(y_pred)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `matrix[i][j]`: rows whose true label is `labels[i]` predicted as `labels[j]`
pub fn confusion_matrix(y_true: &[Label], y_pred: &[Label], labels: &[Label]) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; labels.len()]; labels.len()];
    for (t, p) in y_true.iter().zip(y_pred) {
        if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
            matrix[i][j] += 1;
        }
    }
    matrix
}

impl ClassificationReport {
    pub fn compute(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(Error::InvalidInput(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(Error::InvalidInput("cannot evaluate an empty set".into()));
        }

        let labels = label_union(y_true, y_pred);
        let matrix = confusion_matrix(y_true, y_pred, &labels);

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = matrix[i][i];
                let support: usize = matrix[i].iter().sum();
                let predicted: usize = matrix.iter().map(|row| row[i]).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1: f1_score(precision, recall),
                    support,
                }
            })
            .collect();

        let total = y_true.len();
        let n_classes = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Ok(Self {
            accuracy: accuracy(y_true, y_pred),
            classes,
            macro_avg,
            weighted_avg,
            total,
        })
    }

    /// Support-weighted F1, the grid-search objective
    pub fn weighted_f1(&self) -> f64 {
        self.weighted_avg.f1
    }

    /// Fixed-width text table
    pub fn render(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.to_string().len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        let mut out = format!(
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for c in &self.classes {
            out.push_str(&format!(
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                c.label, c.precision, c.recall, c.f1, c.support
            ));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}\n",
            "accuracy", "", "", self.accuracy, self.total
        ));
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                name, avg.precision, avg.recall, avg.f1, self.total
            ));
        }
        out
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
