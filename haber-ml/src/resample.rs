//! Class rebalancing by resampling

use crate::dataset::Label;
use haber_common::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

/// Resample every class to exactly `target_count` rows and shuffle.
///
/// Classes with at least `target_count` rows are sampled without
/// replacement; smaller classes are drawn with replacement. Returns row
/// indices into `labels`.
pub fn oversample(labels: &[Label], target_count: usize, seed: u64) -> Result<Vec<usize>> {
    if target_count == 0 {
        return Err(Error::InvalidInput("target_count must be positive".into()));
    }

    let mut by_class: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(by_class.len() * target_count);

    for (label, members) in &by_class {
        if members.len() >= target_count {
            rows.extend(
                index::sample(&mut rng, members.len(), target_count)
                    .into_iter()
                    .map(|pos| members[pos]),
            );
        } else {
            rows.extend((0..target_count).map(|_| members[rng.gen_range(0..members.len())]));
        }
        debug!("Class {}: {} -> {} rows", label, members.len(), target_count);
    }

    rows.shuffle(&mut rng);
    Ok(rows)
}
