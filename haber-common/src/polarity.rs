//! Label-to-polarity mapping
//!
//! Classifiers emit a stance label in `0..=10`. Label 0 is the only
//! non-negative class; every other label is negative with the label value as
//! its severity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest label a classifier may emit
pub const MAX_LABEL: u8 = 10;

/// Categorical polarity stored as the analysis `durum`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "Olumlu", alias = "positive")]
    Positive,
    #[serde(rename = "Olumsuz", alias = "negative")]
    Negative,
}

impl Polarity {
    /// Stored/wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "Olumlu",
            Polarity::Negative => "Olumsuz",
        }
    }

    /// Parse a stored name, accepting the English aliases
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Olumlu" | "positive" => Some(Polarity::Positive),
            "Olumsuz" | "negative" => Some(Polarity::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polarity plus severity score derived from a predicted label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub polarity: Polarity,
    pub score: u8,
}

impl Verdict {
    /// Map a classifier label to a verdict.
    ///
    /// Labels above [`MAX_LABEL`] are clamped; they cannot come out of a
    /// pipeline trained on validated data.
    pub fn from_label(label: u8) -> Self {
        if label == 0 {
            Verdict {
                polarity: Polarity::Positive,
                score: 0,
            }
        } else {
            Verdict {
                polarity: Polarity::Negative,
                score: label.min(MAX_LABEL),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_positive_with_zero_score() {
        let verdict = Verdict::from_label(0);
        assert_eq!(verdict.polarity, Polarity::Positive);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn nonzero_labels_are_negative_with_label_score() {
        for label in 1..=MAX_LABEL {
            let verdict = Verdict::from_label(label);
            assert_eq!(verdict.polarity, Polarity::Negative);
            assert_eq!(verdict.score, label);
        }
    }

    #[test]
    fn polarity_round_trips_through_wire_names() {
        assert_eq!(Polarity::parse("Olumlu"), Some(Polarity::Positive));
        assert_eq!(Polarity::parse("negative"), Some(Polarity::Negative));
        assert_eq!(Polarity::parse("neutral"), None);
        assert_eq!(
            serde_json::to_string(&Polarity::Negative).unwrap(),
            "\"Olumsuz\""
        );
    }
}
