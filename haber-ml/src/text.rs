//! Text normalization
//!
//! Lowercase, punctuation to spaces, optional digit stripping, whitespace
//! collapse, and (for training) stop-word and short-token removal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Turkish stop-word list (NLTK corpus)
const TURKISH_STOP_WORD_CORPUS: [&str; 53] = [
    "acaba", "ama", "aslında", "az", "bazı", "belki", "biri", "birkaç", "birşey", "biz", "bu",
    "çok", "çünkü", "da", "daha", "de", "defa", "diye", "eğer", "en", "gibi", "hem", "hep",
    "hepsi", "her", "hiç", "için", "ile", "ise", "kez", "ki", "kim", "mı", "mu", "mü", "nasıl",
    "ne", "neden", "nerde", "nerede", "nereye", "niçin", "niye", "o", "sanki", "şey", "siz",
    "şu", "tüm", "ve", "veya", "ya", "yani",
];

/// Tokens shorter than this are dropped when token filtering is on
pub const MIN_TOKEN_CHARS: usize = 3;

/// Stop-words longer than two characters; shorter ones go through the
/// length filter anyway.
pub static TURKISH_STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    TURKISH_STOP_WORD_CORPUS
        .iter()
        .copied()
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
});

pub fn is_stop_word(token: &str) -> bool {
    TURKISH_STOP_WORDS.contains(token)
}

/// Text cleaner settings, stored in the model artifact so serving cleans
/// exactly as training did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCleaner {
    pub strip_digits: bool,
    /// Drop stop-words and tokens shorter than [`MIN_TOKEN_CHARS`]
    pub filter_tokens: bool,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::training(true)
    }
}

impl TextCleaner {
    /// Training preset: token filtering on
    pub fn training(strip_digits: bool) -> Self {
        Self {
            strip_digits,
            filter_tokens: true,
        }
    }

    /// Normalize `text`. Pure and idempotent; may return an empty string.
    pub fn clean(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let mut normalized = NON_WORD.replace_all(&lowered, " ").into_owned();
        if self.strip_digits {
            normalized = DIGITS.replace_all(&normalized, " ").into_owned();
        }

        normalized
            .split_whitespace()
            .filter(|token| !self.filter_tokens || keep_token(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn keep_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_CHARS && !is_stop_word(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 6] = [
        "Ekonomi, 2024 yılında %5 büyüdü!",
        "Bakan açıklama yaptı: \"Çok önemli bir adım.\"",
        "  ve   ile  ama  ",
        "",
        "İSTANBUL'da yağmur; trafik 3 saat sürdü...",
        "snake_case kelimeler ve a1b2 karışık",
    ];

    #[test]
    fn lowercases_and_strips_punctuation() {
        let cleaner = TextCleaner::training(false);
        assert_eq!(
            cleaner.clean("Ekonomi, BÜYÜDÜ! Rekor kırıldı."),
            "ekonomi büyüdü rekor kırıldı"
        );
    }

    #[test]
    fn digit_stripping_is_optional() {
        let text = "Enflasyon 2024 yılında yüzde 45";
        assert_eq!(
            TextCleaner::training(true).clean(text),
            "enflasyon yılında yüzde"
        );
        assert_eq!(
            TextCleaner::training(false).clean(text),
            "enflasyon 2024 yılında yüzde"
        );
    }

    #[test]
    fn removes_stop_words_and_short_tokens() {
        let cleaner = TextCleaner::training(true);
        assert_eq!(cleaner.clean("Bu haber çok ama çok önemli ve acil"), "haber önemli acil");
    }

    #[test]
    fn all_stop_words_yield_empty_string() {
        let cleaner = TextCleaner::training(true);
        assert_eq!(cleaner.clean("ve ile ama için gibi"), "");
        assert_eq!(cleaner.clean(""), "");
        assert_eq!(cleaner.clean("!!! ... ???"), "");
    }

    #[test]
    fn unfiltered_cleaner_keeps_short_tokens() {
        let cleaner = TextCleaner {
            strip_digits: true,
            filter_tokens: false,
        };
        assert_eq!(cleaner.clean("O bu, ve 12 şu!"), "o bu ve şu");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let cleaners = [
            TextCleaner::training(true),
            TextCleaner::training(false),
            TextCleaner {
                strip_digits: false,
                filter_tokens: false,
            },
        ];
        for cleaner in cleaners {
            for sample in SAMPLES {
                let once = cleaner.clean(sample);
                assert_eq!(cleaner.clean(&once), once, "not idempotent for {:?}", sample);
            }
        }
    }

    #[test]
    fn stop_word_list_excludes_short_entries() {
        assert!(is_stop_word("için"));
        assert!(is_stop_word("yani"));
        assert!(!is_stop_word("ve"));
        assert!(!is_stop_word("o"));
    }
}
