//! Pure counting summary.

use std::collections::HashSet;

use super::types::Summary;
use crate::docforge::extract::enrich;

/// Computes the counting summary of one text
pub fn summarize(text: &str) -> Summary {
    let word_count = enrich::word_count(text);
    let char_count = enrich::char_count(text);
    let sentence_count = enrich::sentence_count(text);

    let unique_words = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<HashSet<_>>()
        .len();

    let lexical_diversity = if word_count == 0 {
        0.0
    } else {
        unique_words as f64 / word_count as f64
    };

    let avg_sentence_length = if sentence_count == 0 {
        0.0
    } else {
        word_count as f64 / sentence_count as f64
    };

    Summary {
        word_count,
        char_count,
        sentence_count,
        avg_word_length: enrich::avg_word_length(text),
        avg_sentence_length,
        unique_words,
        lexical_diversity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_counts() {
        let s = summarize("One two three. Four five.");
        assert_eq!(s.word_count, 5);
        assert_eq!(s.sentence_count, 2);
        assert_eq!(s.unique_words, 5);
        assert_eq!(s.lexical_diversity, 1.0);
        assert!((s.avg_sentence_length - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_unique_words_are_case_folded() {
        let s = summarize("The the THE");
        assert_eq!(s.word_count, 3);
        assert_eq!(s.unique_words, 1);
    }

    #[test]
    fn test_empty_text_is_all_zeros() {
        let s = summarize("");
        assert_eq!(s.word_count, 0);
        assert_eq!(s.char_count, 0);
        assert_eq!(s.sentence_count, 0);
        assert_eq!(s.avg_word_length, 0.0);
        assert_eq!(s.avg_sentence_length, 0.0);
        assert_eq!(s.unique_words, 0);
        assert_eq!(s.lexical_diversity, 0.0);
    }

    proptest! {
        #[test]
        fn prop_lexical_diversity_in_unit_interval(text in ".{0,400}") {
            let s = summarize(&text);
            prop_assert!((0.0..=1.0).contains(&s.lexical_diversity));
        }
    }
}
