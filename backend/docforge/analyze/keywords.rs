//! Keyword extraction.
//!
//! Advanced mode chunks the text into stopword-delimited noun phrases and
//! boosts entity surface forms 1.5x; fallback mode ranks stopword-filtered
//! word tokens by frequency. Both paths lowercase, drop pure-number tokens,
//! and break score ties by first appearance.

use std::cmp::Ordering;
use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashMap;

use super::types::{Entity, Keyword, KeywordType};

/// Score multiplier for named-entity surface forms
const ENTITY_BOOST: f64 = 1.5;

/// Longest phrase emitted by the noun-phrase chunker
const MAX_PHRASE_TOKENS: usize = 3;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").expect("Failed to compile WORD_RE");

    /// English stopwords, lowercased once at startup
    static ref STOPWORDS: HashSet<String> = {
        stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|w| w.to_lowercase())
            .collect()
    };
}

fn is_pure_number(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
}

/// A candidate keyword accumulating score and first-appearance order
struct Scored {
    score: f64,
    first_seen: usize,
    keyword_type: KeywordType,
}

/// Ranks the accumulated candidates and returns the top `top_n`
fn rank(candidates: FxHashMap<String, Scored>, top_n: usize) -> Vec<Keyword> {
    let mut ranked: Vec<(String, Scored)> = candidates.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(Ordering::Equal)
            .then(a.1.first_seen.cmp(&b.1.first_seen))
    });

    ranked
        .into_iter()
        .take(top_n)
        .map(|(keyword, scored)| Keyword {
            keyword,
            score: scored.score,
            keyword_type: scored.keyword_type,
        })
        .collect()
}

/// Fallback path: frequency over stopword-filtered word tokens
fn token_candidates(text: &str) -> FxHashMap<String, Scored> {
    let mut candidates: FxHashMap<String, Scored> = FxHashMap::default();
    for (position, m) in WORD_RE.find_iter(text).enumerate() {
        let token = m.as_str().to_lowercase();
        if token.len() <= 1 || STOPWORDS.contains(&token) || is_pure_number(&token) {
            continue;
        }
        let entry = candidates.entry(token).or_insert(Scored {
            score: 0.0,
            first_seen: position,
            keyword_type: KeywordType::NounPhrase,
        });
        entry.score += 1.0;
    }
    candidates
}

/// Advanced path: phrase candidates over stopword-delimited token runs.
///
/// Runs break at stopwords, numbers, and any non-whitespace separator
/// (punctuation); every 1..=3-gram window inside a run counts as a phrase.
fn chunk_candidates(text: &str) -> FxHashMap<String, Scored> {
    let mut runs: Vec<Vec<(usize, String)>> = Vec::new();
    let mut current: Vec<(usize, String)> = Vec::new();
    let mut last_end: Option<usize> = None;

    for (position, m) in WORD_RE.find_iter(text).enumerate() {
        let token = m.as_str().to_lowercase();
        let punctuation_break = last_end
            .map(|end| text[end..m.start()].chars().any(|c| !c.is_whitespace()))
            .unwrap_or(false);

        if punctuation_break && !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }

        if STOPWORDS.contains(&token) || is_pure_number(&token) || token.len() <= 1 {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push((position, token));
        }
        last_end = Some(m.end());
    }
    if !current.is_empty() {
        runs.push(current);
    }

    let mut candidates: FxHashMap<String, Scored> = FxHashMap::default();
    for run in &runs {
        for n in 1..=MAX_PHRASE_TOKENS.min(run.len()) {
            for window in run.windows(n) {
                let keyword = window
                    .iter()
                    .map(|(_, t)| t.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let first_seen = window[0].0;
                let entry = candidates.entry(keyword).or_insert(Scored {
                    score: 0.0,
                    first_seen,
                    keyword_type: KeywordType::NounPhrase,
                });
                entry.score += 1.0;
                entry.first_seen = entry.first_seen.min(first_seen);
            }
        }
    }

    candidates
}

/// Extracts the top `top_n` keywords from `text`.
///
/// `entities` carries the analyzer's entity spans when entity extraction ran
/// in model mode; their surface forms receive the 1.5x boost.
pub fn extract_keywords(
    text: &str,
    entities: Option<&[Entity]>,
    top_n: usize,
    model_mode: bool,
) -> Vec<Keyword> {
    let mut candidates = if model_mode {
        chunk_candidates(text)
    } else {
        token_candidates(text)
    };

    if let Some(entities) = entities {
        let mut surface_counts: FxHashMap<String, usize> = FxHashMap::default();
        for entity in entities {
            let surface = entity.text.trim().to_lowercase();
            if surface.is_empty() || is_pure_number(&surface) {
                continue;
            }
            *surface_counts.entry(surface).or_insert(0) += 1;
        }

        for (surface, count) in surface_counts {
            let base = candidates
                .get(&surface)
                .map(|s| s.score)
                .unwrap_or(count as f64);
            let entry = candidates.entry(surface).or_insert(Scored {
                score: 0.0,
                first_seen: usize::MAX,
                keyword_type: KeywordType::Entity,
            });
            entry.score = base * ENTITY_BOOST;
            entry.keyword_type = KeywordType::Entity;
        }
    }

    rank(candidates, top_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docforge::analyze::types::EntityLabel;

    #[test]
    fn test_frequency_ordering() {
        let text = "cache cache cache index index server";
        let keywords = extract_keywords(text, None, 10, false);
        assert_eq!(keywords[0].keyword, "cache");
        assert_eq!(keywords[0].score, 3.0);
        assert_eq!(keywords[1].keyword, "index");
        assert_eq!(keywords[2].keyword, "server");
    }

    #[test]
    fn test_stopwords_and_numbers_removed() {
        let text = "the quick system and the 42 responses";
        let keywords = extract_keywords(text, None, 10, false);
        let words: Vec<&str> = keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert!(!words.contains(&"the"));
        assert!(!words.contains(&"and"));
        assert!(!words.contains(&"42"));
        assert!(words.contains(&"system"));
    }

    #[test]
    fn test_ties_break_by_first_appearance() {
        let text = "zebra apple zebra apple";
        let keywords = extract_keywords(text, None, 10, false);
        assert_eq!(keywords[0].keyword, "zebra");
        assert_eq!(keywords[1].keyword, "apple");
    }

    #[test]
    fn test_top_n_is_honored() {
        let text = "alpha beta gamma delta epsilon";
        let keywords = extract_keywords(text, None, 2, false);
        assert_eq!(keywords.len(), 2);
    }

    #[test]
    fn test_entity_surface_forms_get_boost() {
        let text = "apple apple banana banana";
        let entities = vec![Entity {
            text: "banana".to_string(),
            label: EntityLabel::Product,
            start: 0,
            end: 6,
            confidence: 1.0,
        }];
        let keywords = extract_keywords(text, Some(&entities), 10, false);
        let banana = keywords.iter().find(|k| k.keyword == "banana").unwrap();
        let apple = keywords.iter().find(|k| k.keyword == "apple").unwrap();
        assert_eq!(banana.keyword_type, KeywordType::Entity);
        assert_eq!(banana.score, 3.0); // 2 occurrences * 1.5
        assert_eq!(apple.score, 2.0);
        assert_eq!(keywords[0].keyword, "banana");
    }

    #[test]
    fn test_chunk_mode_produces_phrases() {
        let text = "The vector index stores document embeddings. The vector index persists.";
        let keywords = extract_keywords(text, None, 10, true);
        let words: Vec<&str> = keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert!(words.contains(&"vector index"), "{words:?}");
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_keywords("", None, 10, false).is_empty());
        assert!(extract_keywords("", None, 10, true).is_empty());
    }
}
