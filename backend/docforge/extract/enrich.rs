//! Deterministic paragraph enrichment.
//!
//! Every value computed here is a pure function of the paragraph text: no
//! I/O, no NLP model. The flags feed search filtering, export columns, and
//! the RAG document categorization.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::EnrichmentMetadata;

lazy_static! {
    /// Email addresses
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .expect("Failed to compile EMAIL_RE");

    /// http(s) and www URLs
    static ref URL_RE: Regex =
        Regex::new(r#"(?:https?://|www\.)[^\s<>"]+"#).expect("Failed to compile URL_RE");

    /// Dates: month-name forms, numeric forms, ISO forms
    static ref DATE_RE: Regex = Regex::new(
        r"(?x)
        (?:\b(?:January|February|March|April|May|June|July|August|September|October|November|December)
            \s+\d{1,2}(?:st|nd|rd|th)?(?:,\s*\d{4})?\b)
        | (?:\b\d{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)
            (?:\s+\d{4})?\b)
        | (?:\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b)
        | (?:\b\d{4}-\d{2}-\d{2}\b)"
    )
    .expect("Failed to compile DATE_RE");

    /// Bullet markers and numeric enumerators at line start
    static ref LIST_ITEM_RE: Regex =
        Regex::new(r"^(?:[-*•–—▪◦]\s|\d{1,3}[.)]\s|\(?[a-z]\)\s|[ivxIVX]{1,5}[.)]\s)")
            .expect("Failed to compile LIST_ITEM_RE");
}

/// Number of whitespace-separated tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of characters
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Number of sentences, counted as runs of terminal punctuation
pub fn sentence_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_terminal = false;
    for ch in text.chars() {
        if matches!(ch, '.' | '!' | '?') {
            if !in_terminal {
                count += 1;
            }
            in_terminal = true;
        } else {
            in_terminal = false;
        }
    }
    count
}

/// Mean word length in characters, 0.0 for empty text
pub fn avg_word_length(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let total: usize = words.iter().map(|w| w.chars().count()).sum();
    total as f64 / words.len() as f64
}

/// Whether the text looks like a section heading: short, no terminal
/// punctuation, and most alphabetic words capitalized
pub fn likely_heading(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || words.len() > 12 || char_count(text) > 80 {
        return false;
    }
    if text
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ';' | ':' | ','))
    {
        return false;
    }
    let alphabetic: Vec<&&str> = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_alphabetic()))
        .collect();
    if alphabetic.is_empty() {
        return false;
    }
    let capitalized = alphabetic
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    capitalized * 2 >= alphabetic.len()
}

/// Computes all enrichment flags for one paragraph
pub fn enrich(text: &str) -> EnrichmentMetadata {
    let first_char = text.chars().next();
    let last_char = text.chars().last();

    EnrichmentMetadata {
        sentence_count: sentence_count(text),
        avg_word_length: avg_word_length(text),
        has_numbers: text.chars().any(|c| c.is_ascii_digit()),
        has_special_chars: text.chars().any(|c| {
            !c.is_alphanumeric()
                && !c.is_whitespace()
                && !matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '(' | ')' | '-')
        }),
        starts_with_capital: first_char.is_some_and(|c| c.is_uppercase()),
        ends_with_punctuation: last_char.is_some_and(|c| matches!(c, '.' | '!' | '?' | ';' | ':')),
        is_question: last_char == Some('?'),
        likely_heading: likely_heading(text),
        likely_list_item: LIST_ITEM_RE.is_match(text),
        has_dates: DATE_RE.is_match(text),
        has_emails: EMAIL_RE.is_match(text),
        has_urls: URL_RE.is_match(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_and_char_counts() {
        assert_eq!(word_count("two words"), 2);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  spaced   out  "), 2);
        assert_eq!(char_count("abc"), 3);
        assert_eq!(char_count("héllo"), 5);
    }

    #[test]
    fn test_sentence_count_collapses_runs() {
        assert_eq!(sentence_count("One. Two! Three?"), 3);
        assert_eq!(sentence_count("Wait... what"), 1);
        assert_eq!(sentence_count("no terminal punctuation"), 0);
    }

    #[test]
    fn test_heading_detection() {
        assert!(likely_heading("Chapter One: The Beginning"));
        assert!(likely_heading("Introduction"));
        assert!(!likely_heading("This is a full sentence that ends properly."));
        assert!(!likely_heading(
            "a very long line of lowercase words that keeps going and going and \
             going far past any plausible heading length limit"
        ));
    }

    #[test]
    fn test_list_item_detection() {
        for item in ["- first", "* second", "• third", "1. fourth", "12) fifth", "(a) sixth"] {
            assert!(enrich(item).likely_list_item, "expected list item: {item}");
        }
        assert!(!enrich("plain text paragraph").likely_list_item);
    }

    #[test]
    fn test_date_email_url_flags() {
        let m = enrich("Contact alice@example.com before April 1, 1976 via https://example.com.");
        assert!(m.has_dates);
        assert!(m.has_emails);
        assert!(m.has_urls);
        assert!(m.has_numbers);

        let plain = enrich("Nothing notable here");
        assert!(!plain.has_dates);
        assert!(!plain.has_emails);
        assert!(!plain.has_urls);
    }

    #[test]
    fn test_question_and_capital_flags() {
        let q = enrich("Is this a question?");
        assert!(q.is_question);
        assert!(q.ends_with_punctuation);
        assert!(q.starts_with_capital);

        let s = enrich("lowercase statement.");
        assert!(!s.is_question);
        assert!(s.ends_with_punctuation);
        assert!(!s.starts_with_capital);
    }

    #[test]
    fn test_enrichment_is_deterministic() {
        let text = "Results improved by 40% in Q3. See https://example.com for details.";
        assert_eq!(enrich(text), enrich(text));
    }
}
