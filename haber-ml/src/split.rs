//! Stratified train/test split and cross-validation folds

use crate::dataset::Label;
use haber_common::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Row indices of a partition, each side sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn indices_by_class(labels: &[Label]) -> BTreeMap<Label, Vec<usize>> {
    let mut by_class: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }
    by_class
}

/// Test rows taken from a class of `n`: at least one when the class has two
/// or more members, and never the whole class
fn test_quota(n: usize, test_size: f64) -> usize {
    if n < 2 {
        return 0;
    }
    ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
}

/// Split preserving per-class proportions. Same labels and seed always give
/// the same partition.
pub fn stratified_split(labels: &[Label], test_size: f64, seed: u64) -> Result<Partition> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidInput(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut partition = Partition {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };

    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(&mut rng);
        let quota = test_quota(members.len(), test_size);
        partition.test.extend_from_slice(&members[..quota]);
        partition.train.extend_from_slice(&members[quota..]);
    }

    partition.train.sort_unstable();
    partition.test.sort_unstable();
    Ok(partition)
}

/// `k` stratified folds; fold `i`'s `test` side is its validation set
pub fn stratified_folds(labels: &[Label], k: usize, seed: u64) -> Result<Vec<Partition>> {
    if k < 2 {
        return Err(Error::InvalidInput(format!("need at least 2 folds, got {}", k)));
    }
    if labels.len() < k {
        return Err(Error::InvalidInput(format!(
            "cannot make {} folds from {} rows",
            k,
            labels.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0usize; labels.len()];
    let mut next_fold = 0usize;

    // Round-robin across classes keeps fold sizes within one of each other
    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(&mut rng);
        for idx in members {
            assignment[idx] = next_fold;
            next_fold = (next_fold + 1) % k;
        }
    }

    let folds = (0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&idx| assignment[idx] == fold);
            Partition { train, test }
        })
        .collect();
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<Label> {
        let mut labels = vec![0; 50];
        labels.extend(vec![3; 30]);
        labels.extend(vec![10; 20]);
        labels.push(7);
        labels
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        let labels = labels();
        let a = stratified_split(&labels, 0.2, 42).unwrap();
        let b = stratified_split(&labels, 0.2, 42).unwrap();
        let c = stratified_split(&labels, 0.2, 7).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn split_preserves_class_proportions() {
        let labels = labels();
        let partition = stratified_split(&labels, 0.2, 42).unwrap();

        let count = |rows: &[usize], class: Label| rows.iter().filter(|&&i| labels[i] == class).count();
        assert_eq!(count(&partition.test, 0), 10);
        assert_eq!(count(&partition.test, 3), 6);
        assert_eq!(count(&partition.test, 10), 4);
        // Singleton class stays in train
        assert_eq!(count(&partition.test, 7), 0);
        assert_eq!(partition.train.len() + partition.test.len(), labels.len());
    }

    #[test]
    fn small_classes_keep_a_training_row() {
        let labels = vec![1, 1, 2, 2, 2];
        let partition = stratified_split(&labels, 0.9, 1).unwrap();
        assert_eq!(partition.train.len(), 2);
        assert_eq!(partition.test.len(), 3);
    }

    #[test]
    fn split_rejects_bad_test_size() {
        assert!(stratified_split(&[0, 1], 0.0, 1).is_err());
        assert!(stratified_split(&[0, 1], 1.0, 1).is_err());
        assert!(stratified_split(&[0, 1], f64::NAN, 1).is_err());
    }

    #[test]
    fn folds_cover_every_row_once() {
        let labels = labels();
        let folds = stratified_folds(&labels, 5, 42).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0; labels.len()];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), labels.len());
            for &idx in &fold.test {
                seen[idx] += 1;
            }
            let zeros = fold.test.iter().filter(|&&i| labels[i] == 0).count();
            assert_eq!(zeros, 10);
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn folds_need_enough_rows() {
        assert!(stratified_folds(&[0, 1], 3, 1).is_err());
        assert!(stratified_folds(&[0, 1, 0], 1, 1).is_err());
    }
}
