//! TF-IDF vectorizer
//!
//! Tokens are runs of two or more word characters. Stop-words are removed
//! before n-grams are formed. IDF is smoothed, `ln((1 + n) / (1 + df)) + 1`,
//! and every output row is L2-normalized.

use crate::sparse::{FeatureMatrix, SparseVector};
use crate::text::is_stop_word;
use haber_common::{Error, Result};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Keep only the most frequent terms; `None` keeps all
    pub max_features: Option<usize>,
    /// Inclusive `(min_n, max_n)`
    pub ngram_range: (usize, usize),
    pub stop_words: bool,
}

impl TfidfConfig {
    pub fn new(max_features: usize, ngram_range: (usize, usize)) -> Self {
        Self {
            max_features: Some(max_features),
            ngram_range,
            stop_words: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::InvalidInput(format!(
                "invalid n-gram range ({}, {})",
                min_n, max_n
            )));
        }
        if self.max_features == Some(0) {
            return Err(Error::InvalidInput("max_features must be positive".into()));
        }
        Ok(())
    }
}

/// Fitted vectorizer. `terms` is sorted, and a term's position is its column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    terms: Vec<String>,
    idf: Vec<f32>,
}

#[derive(Default, Clone, Copy)]
struct TermStats {
    term_freq: u64,
    doc_freq: u32,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights from `docs`
    pub fn fit<S: AsRef<str> + Sync>(config: TfidfConfig, docs: &[S]) -> Result<Self> {
        config.validate()?;

        let stats: HashMap<String, TermStats> = docs
            .par_iter()
            .fold(HashMap::new, |mut acc: HashMap<String, TermStats>, doc| {
                for (term, count) in term_counts(&config, doc.as_ref()) {
                    let entry = acc.entry(term).or_default();
                    entry.term_freq += u64::from(count);
                    entry.doc_freq += 1;
                }
                acc
            })
            .reduce(HashMap::new, |mut left, right| {
                for (term, s) in right {
                    let entry = left.entry(term).or_default();
                    entry.term_freq += s.term_freq;
                    entry.doc_freq += s.doc_freq;
                }
                left
            });

        if stats.is_empty() {
            return Err(Error::InvalidInput(
                "empty vocabulary: documents contain only stop-words or short tokens".into(),
            ));
        }

        let mut ranked: Vec<(String, TermStats)> = stats.into_iter().collect();
        if let Some(limit) = config.max_features {
            if ranked.len() > limit {
                ranked.sort_unstable_by(|(ta, sa), (tb, sb)| {
                    sb.term_freq.cmp(&sa.term_freq).then_with(|| ta.cmp(tb))
                });
                ranked.truncate(limit);
            }
        }
        ranked.sort_unstable_by(|(ta, _), (tb, _)| ta.cmp(tb));

        let n_docs = docs.len() as f64;
        let idf = ranked
            .iter()
            .map(|(_, s)| (((1.0 + n_docs) / (1.0 + f64::from(s.doc_freq))).ln() + 1.0) as f32)
            .collect();
        let terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();

        debug!(
            "TF-IDF fitted: {} documents, {} terms, ngram {:?}",
            docs.len(),
            terms.len(),
            config.ngram_range
        );

        Ok(Self { config, terms, idf })
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(
        config: TfidfConfig,
        docs: &[S],
    ) -> Result<(Self, FeatureMatrix)> {
        let vectorizer = Self::fit(config, docs)?;
        let matrix = vectorizer.transform(docs);
        Ok((vectorizer, matrix))
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Column of `term`, if it is in the vocabulary
    pub fn column(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    /// Vectorize one document. Unknown terms are ignored, so an empty or
    /// fully out-of-vocabulary document maps to the zero vector.
    pub fn transform_one(&self, doc: &str) -> SparseVector {
        let pairs = term_counts(&self.config, doc)
            .into_iter()
            .filter_map(|(term, count)| {
                self.column(&term)
                    .map(|col| (col as u32, count as f32 * self.idf[col]))
            })
            .collect();
        let mut row = SparseVector::from_pairs(pairs);
        row.normalize();
        row
    }

    pub fn transform<S: AsRef<str> + Sync>(&self, docs: &[S]) -> FeatureMatrix {
        let rows = docs
            .par_iter()
            .map(|doc| self.transform_one(doc.as_ref()))
            .collect();
        FeatureMatrix::new(rows, self.n_features())
    }
}

fn tokenize(config: &TfidfConfig, doc: &str) -> Vec<String> {
    let lowered = doc.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !config.stop_words || !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

fn term_counts(config: &TfidfConfig, doc: &str) -> HashMap<String, u32> {
    let tokens = tokenize(config, doc);
    let (min_n, max_n) = config.ngram_range;
    let mut counts = HashMap::new();

    for n in min_n..=max_n {
        if n == 1 {
            for token in &tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
        } else {
            for window in tokens.windows(n) {
                *counts.entry(window.join(" ")).or_insert(0) += 1;
            }
        }
    }

    counts
}
