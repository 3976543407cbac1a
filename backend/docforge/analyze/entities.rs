//! Named-entity extraction.
//!
//! Two tiers: gazetteer matches from a loaded model directory (confidence
//! 1.0), and a regex + capitalization-heuristic fallback (confidence 0.6)
//! that keeps the operation callable when no model is present. Overlapping
//! spans are resolved last-wins in character order.

use lazy_static::lazy_static;
use regex::Regex;

use super::engine::Gazetteer;
use super::types::{Entity, EntityLabel};

/// Confidence assigned to model (gazetteer) spans
const MODEL_CONFIDENCE: f64 = 1.0;

/// Confidence assigned to regex and heuristic spans
const FALLBACK_CONFIDENCE: f64 = 0.6;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .expect("Failed to compile EMAIL_RE");

    static ref URL_RE: Regex =
        Regex::new(r#"(?:https?://|www\.)[^\s<>"]+"#).expect("Failed to compile URL_RE");

    static ref PHONE_RE: Regex =
        Regex::new(r"(?:\+\d{1,3}[-. ]?)?\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}")
            .expect("Failed to compile PHONE_RE");

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

    static ref TIME_RE: Regex =
        Regex::new(r"\b\d{1,2}:\d{2}(?::\d{2})?(?:\s?[apAP]\.?[mM]\.?)?\b")
            .expect("Failed to compile TIME_RE");

    static ref MONEY_RE: Regex = Regex::new(
        r"(?:[$€£¥]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:million|billion|thousand|[KMB]))?)|(?:\b\d[\d,]*(?:\.\d+)?\s?(?:USD|EUR|GBP|JPY|CNY)\b)"
    )
    .expect("Failed to compile MONEY_RE");

    static ref PERCENT_RE: Regex =
        Regex::new(r"\d+(?:\.\d+)?\s?%").expect("Failed to compile PERCENT_RE");

    static ref ORDINAL_RE: Regex =
        Regex::new(r"\b\d+(?:st|nd|rd|th)\b").expect("Failed to compile ORDINAL_RE");

    static ref CARDINAL_RE: Regex =
        Regex::new(r"\b\d[\d,]*(?:\.\d+)?\b").expect("Failed to compile CARDINAL_RE");

    /// Word tokens, for the capitalization heuristics
    static ref TOKEN_RE: Regex =
        Regex::new(r"[A-Za-z][A-Za-z0-9.&'’-]*").expect("Failed to compile TOKEN_RE");
}

/// Corporate suffixes that mark a capitalized run as an organization
const ORG_SUFFIXES: &[&str] = &[
    "Inc", "Inc.", "Corp", "Corp.", "Ltd", "Ltd.", "LLC", "Co", "Co.", "Company", "Corporation",
    "Group", "Labs", "Technologies", "University", "Institute", "Foundation",
];

/// Prepositions whose following capitalized run is read as a place
const LOCATIVE_PREPOSITIONS: &[&str] = &["in", "at", "from", "near"];

/// Markers whose following capitalized bigram is read as a person
const AGENTIVE_MARKERS: &[&str] = &["by", "with"];

/// A byte-offset entity candidate, pre overlap resolution
#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    label: EntityLabel,
    confidence: f64,
}

/// A word token with its byte span
#[derive(Debug)]
struct Token<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

impl Token<'_> {
    fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(|c| c.is_uppercase())
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| {
            // Sentence-final periods are not part of the token, but dotted
            // forms like "Inc." and "U.S." keep theirs.
            let s = m.as_str();
            let end = if s.ends_with('.')
                && !ORG_SUFFIXES.contains(&s)
                && !s[..s.len() - 1].contains('.')
            {
                m.end() - 1
            } else {
                m.end()
            };
            Token {
                start: m.start(),
                end,
                text: &text[m.start()..end],
            }
        })
        .collect()
}

fn push_matches(candidates: &mut Vec<Candidate>, re: &Regex, text: &str, label: EntityLabel) {
    for m in re.find_iter(text) {
        candidates.push(Candidate {
            start: m.start(),
            end: m.end(),
            label,
            confidence: FALLBACK_CONFIDENCE,
        });
    }
}

/// Structural patterns that hold in both modes
fn structural_candidates(text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    push_matches(&mut candidates, &EMAIL_RE, text, EntityLabel::Email);
    push_matches(&mut candidates, &URL_RE, text, EntityLabel::Url);
    push_matches(&mut candidates, &DATE_RE, text, EntityLabel::Date);
    push_matches(&mut candidates, &TIME_RE, text, EntityLabel::Time);
    push_matches(&mut candidates, &PHONE_RE, text, EntityLabel::Phone);
    push_matches(&mut candidates, &MONEY_RE, text, EntityLabel::Money);
    push_matches(&mut candidates, &PERCENT_RE, text, EntityLabel::Percent);
    push_matches(&mut candidates, &ORDINAL_RE, text, EntityLabel::Ordinal);
    candidates
}

/// Gazetteer spans: every word-boundary occurrence of a listed surface form
fn gazetteer_candidates(text: &str, gazetteer: &Gazetteer) -> Vec<Candidate> {
    let bytes = text.as_bytes();
    let boundary = |idx: usize| {
        idx == 0
            || idx >= bytes.len()
            || !text[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric())
    };

    let mut candidates = Vec::new();
    for (surface, label) in gazetteer.entries() {
        for (start, matched) in text.match_indices(surface.as_str()) {
            let end = start + matched.len();
            let end_ok = end >= bytes.len()
                || !text[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
            if boundary(start) && end_ok {
                candidates.push(Candidate {
                    start,
                    end,
                    label: *label,
                    confidence: MODEL_CONFIDENCE,
                });
            }
        }
    }
    candidates
}

/// Capitalization heuristics approximating PERSON/ORG/GPE in fallback mode
fn heuristic_candidates(text: &str) -> Vec<Candidate> {
    let tokens = tokenize(text);
    let mut candidates: Vec<Candidate> = Vec::new();
    let covered = |candidates: &[Candidate], start: usize, end: usize| {
        candidates.iter().any(|c| c.start < end && start < c.end)
    };

    // Organizations: capitalized run ending in a corporate suffix.
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_capitalized() {
            let run_start = i;
            let mut run_end = i;
            while run_end + 1 < tokens.len() && tokens[run_end + 1].is_capitalized() {
                run_end += 1;
            }
            if run_end > run_start
                && ORG_SUFFIXES.contains(&tokens[run_end].text)
            {
                candidates.push(Candidate {
                    start: tokens[run_start].start,
                    end: tokens[run_end].end,
                    label: EntityLabel::Org,
                    confidence: FALLBACK_CONFIDENCE,
                });
            }
            i = run_end + 1;
        } else {
            i += 1;
        }
    }

    // Places: capitalized runs after a locative preposition, chained across
    // commas ("in Cupertino, California").
    for (idx, token) in tokens.iter().enumerate() {
        if !LOCATIVE_PREPOSITIONS.contains(&token.text) {
            continue;
        }
        let mut next = idx + 1;
        loop {
            if next >= tokens.len() || !tokens[next].is_capitalized() {
                break;
            }
            let run_start = next;
            while next + 1 < tokens.len()
                && tokens[next + 1].is_capitalized()
                && !text[tokens[next].end..tokens[next + 1].start].contains(',')
            {
                next += 1;
            }
            let (start, end) = (tokens[run_start].start, tokens[next].end);
            if !covered(&candidates, start, end) {
                candidates.push(Candidate {
                    start,
                    end,
                    label: EntityLabel::Gpe,
                    confidence: FALLBACK_CONFIDENCE,
                });
            }
            // Chain continues only across a comma.
            if next + 1 < tokens.len()
                && text[tokens[next].end..tokens[next + 1].start].trim() == ","
                && tokens[next + 1].is_capitalized()
            {
                next += 1;
            } else {
                break;
            }
        }
    }

    // People: capitalized bigrams after an agentive marker, then any
    // remaining uncovered capitalized bigram.
    for (idx, token) in tokens.iter().enumerate() {
        let bigram = match tokens.get(idx + 1) {
            Some(next) if token.is_capitalized() && next.is_capitalized() => {
                (token.start, next.end)
            }
            _ => continue,
        };
        let after_marker = idx > 0 && AGENTIVE_MARKERS.contains(&tokens[idx - 1].text);
        if covered(&candidates, bigram.0, bigram.1) {
            continue;
        }
        if after_marker || !ORG_SUFFIXES.contains(&tokens[idx + 1].text) {
            candidates.push(Candidate {
                start: bigram.0,
                end: bigram.1,
                label: EntityLabel::Person,
                confidence: FALLBACK_CONFIDENCE,
            });
        }
    }

    candidates
}

/// Cardinals fill only the regions no other candidate claimed
fn cardinal_candidates(text: &str, taken: &[Candidate]) -> Vec<Candidate> {
    CARDINAL_RE
        .find_iter(text)
        .filter(|m| !taken.iter().any(|c| c.start < m.end() && m.start() < c.end))
        .map(|m| Candidate {
            start: m.start(),
            end: m.end(),
            label: EntityLabel::Cardinal,
            confidence: FALLBACK_CONFIDENCE,
        })
        .collect()
}

/// Overlap resolution: candidates are walked in character order and a span
/// overlapping the previously kept one replaces it (the later, more specific
/// span wins).
fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| (c.start, c.end));
    let mut resolved: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(last) = resolved.last() {
            if candidate.start < last.end {
                if candidate.start == last.start && candidate.end == last.end {
                    continue;
                }
                resolved.pop();
            }
        }
        resolved.push(candidate);
    }
    resolved
}

/// Extracts entities from `text`, using the gazetteer when one is loaded.
pub fn extract_entities(text: &str, gazetteer: Option<&Gazetteer>) -> Vec<Entity> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut candidates = structural_candidates(text);
    match gazetteer {
        Some(g) => candidates.extend(gazetteer_candidates(text, g)),
        None => candidates.extend(heuristic_candidates(text)),
    }
    let cardinals = cardinal_candidates(text, &candidates);
    candidates.extend(cardinals);

    let resolved = resolve_overlaps(candidates);

    // Byte spans become character offsets so downstream consumers can slice
    // uniformly regardless of encoding.
    resolved
        .into_iter()
        .map(|c| Entity {
            text: text[c.start..c.end].to_string(),
            label: c.label,
            start: text[..c.start].chars().count(),
            end: text[..c.end].chars().count(),
            confidence: c.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_of(entities: &[Entity]) -> Vec<(EntityLabel, &str)> {
        entities.iter().map(|e| (e.label, e.text.as_str())).collect()
    }

    #[test]
    fn test_founding_sentence_extraction() {
        let text =
            "Apple Inc. was founded by Steve Jobs in Cupertino, California on April 1, 1976.";
        let entities = extract_entities(text, None);
        let found = labels_of(&entities);

        assert!(found.contains(&(EntityLabel::Org, "Apple Inc.")), "{found:?}");
        assert!(found.contains(&(EntityLabel::Person, "Steve Jobs")), "{found:?}");
        assert!(found.contains(&(EntityLabel::Gpe, "Cupertino")), "{found:?}");
        assert!(found.contains(&(EntityLabel::Gpe, "California")), "{found:?}");
        assert!(found.contains(&(EntityLabel::Date, "April 1, 1976")), "{found:?}");
    }

    #[test]
    fn test_structural_patterns() {
        let text = "Call 415-555-2671 or email bob@corp.com, visit https://corp.com by 12:30 for a $5,000 deal, up 12% from the 3rd quarter.";
        let entities = extract_entities(text, None);
        let labels: Vec<EntityLabel> = entities.iter().map(|e| e.label).collect();

        assert!(labels.contains(&EntityLabel::Phone));
        assert!(labels.contains(&EntityLabel::Email));
        assert!(labels.contains(&EntityLabel::Url));
        assert!(labels.contains(&EntityLabel::Time));
        assert!(labels.contains(&EntityLabel::Money));
        assert!(labels.contains(&EntityLabel::Percent));
        assert!(labels.contains(&EntityLabel::Ordinal));
    }

    #[test]
    fn test_offsets_are_valid_char_ranges() {
        let text = "Reach out to ana@example.org about the €200 refund.";
        let total = text.chars().count();
        for e in extract_entities(text, None) {
            assert!(e.start < e.end, "{e:?}");
            assert!(e.end <= total, "{e:?}");
            let slice: String = text
                .chars()
                .skip(e.start)
                .take(e.end - e.start)
                .collect();
            assert_eq!(slice, e.text);
        }
    }

    #[test]
    fn test_cardinals_only_outside_other_spans() {
        let text = "The meeting on April 1, 1976 drew 250 people.";
        let entities = extract_entities(text, None);
        let cardinals: Vec<&Entity> = entities
            .iter()
            .filter(|e| e.label == EntityLabel::Cardinal)
            .collect();
        assert_eq!(cardinals.len(), 1);
        assert_eq!(cardinals[0].text, "250");
        assert!(entities.iter().any(|e| e.label == EntityLabel::Date));
    }

    #[test]
    fn test_confidence_tiers() {
        let text = "Money: $40 for Jane Smith.";
        for e in extract_entities(text, None) {
            assert!((e.confidence - 0.6).abs() < f64::EPSILON, "{e:?}");
        }
    }

    #[test]
    fn test_empty_text_yields_no_entities() {
        assert!(extract_entities("", None).is_empty());
    }

    #[test]
    fn test_overlap_resolution_is_last_wins() {
        // "www.example.com" is both a URL and contains no other span; a URL
        // plus a same-start URL duplicate must not produce two entities.
        let text = "see www.example.com now";
        let entities = extract_entities(text, None);
        let urls: Vec<&Entity> = entities.iter().filter(|e| e.label == EntityLabel::Url).collect();
        assert_eq!(urls.len(), 1);
    }
}
