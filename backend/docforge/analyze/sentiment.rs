//! Lexicon-based sentiment scoring.
//!
//! Works identically in both analyzer modes: two fixed indicator word lists,
//! score = (pos - neg) / max(1, pos + neg), class thresholds at ±0.2,
//! confidence = min(1, (pos + neg) / 10).

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::types::{Sentiment, SentimentClass};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "love", "loved", "best",
    "happy", "improved", "improvement", "success", "successful", "positive", "beautiful",
    "impressive", "outstanding", "superb", "delightful", "efficient", "reliable", "innovative",
    "enjoy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "hate", "hated", "poor", "disappointing",
    "disappointed", "failure", "failed", "negative", "broken", "slow", "unreliable", "buggy",
    "problem", "problems", "crash", "crashes", "error", "errors", "useless",
];

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[a-zA-Z']+").expect("Failed to compile WORD_RE");
    static ref POSITIVE_SET: HashSet<&'static str> = POSITIVE_WORDS.iter().copied().collect();
    static ref NEGATIVE_SET: HashSet<&'static str> = NEGATIVE_WORDS.iter().copied().collect();
}

/// Scores one text against the indicator lexicons
pub fn score_sentiment(text: &str) -> Sentiment {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for word in WORD_RE.find_iter(text) {
        let lower = word.as_str().to_lowercase();
        if POSITIVE_SET.contains(lower.as_str()) {
            positive += 1;
        } else if NEGATIVE_SET.contains(lower.as_str()) {
            negative += 1;
        }
    }

    let total = positive + negative;
    let score = (positive as f64 - negative as f64) / (total.max(1)) as f64;
    let sentiment = if score > 0.2 {
        SentimentClass::Positive
    } else if score < -0.2 {
        SentimentClass::Negative
    } else {
        SentimentClass::Neutral
    };

    Sentiment {
        sentiment,
        score,
        confidence: (total as f64 / 10.0).min(1.0),
        positive_indicators: positive,
        negative_indicators: negative,
    }
}
