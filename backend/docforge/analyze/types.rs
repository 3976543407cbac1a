//! Type definitions for text analysis operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

fn default_true() -> bool {
    true
}

fn default_top_keywords() -> usize {
    10
}

/// Which analyzer subsystems to run, with their knobs
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AnalyzeOptions {
    /// Run named-entity extraction
    #[serde(default = "default_true")]
    pub include_entities: bool,

    /// Run keyword extraction
    #[serde(default = "default_true")]
    pub include_keywords: bool,

    /// How many keywords to return
    #[serde(default = "default_top_keywords")]
    #[validate(range(min = 1, max = 50))]
    pub top_keywords: usize,

    /// Run sentiment scoring
    #[serde(default = "default_true")]
    pub include_sentiment: bool,

    /// Run statistical/data extraction
    #[serde(default = "default_true")]
    pub include_statistics: bool,

    /// Run summary counting
    #[serde(default = "default_true")]
    pub include_summary: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            include_entities: true,
            include_keywords: true,
            top_keywords: default_top_keywords(),
            include_sentiment: true,
            include_statistics: true,
            include_summary: true,
        }
    }
}

/// Request body for `POST /api/mine/analyze`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// The text to analyze
    pub text: String,

    /// Subsystem selection
    #[serde(flatten)]
    pub options: AnalyzeOptions,
}

/// Request body for `POST /api/mine/batch-analyze`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchAnalyzeRequest {
    /// The texts to analyze, aggregated in input order
    pub texts: Vec<String>,

    /// Subsystem selection, applied to every text
    #[serde(flatten)]
    pub options: AnalyzeOptions,
}

/// Coarse entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Person,
    Org,
    Gpe,
    Loc,
    Date,
    Time,
    Money,
    Percent,
    Cardinal,
    Ordinal,
    Product,
    Event,
    Email,
    Url,
    Phone,
    Norp,
    Fac,
    Language,
    Quantity,
}

/// One extracted entity span
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Entity {
    /// Surface form as it appears in the source text
    pub text: String,
    /// Coarse entity kind
    pub label: EntityLabel,
    /// Character offset of the span start (inclusive)
    pub start: usize,
    /// Character offset of the span end (exclusive)
    pub end: usize,
    /// 1.0 for model outputs, 0.6 for regex/heuristic fallbacks
    pub confidence: f64,
}

/// How a keyword was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeywordType {
    NounPhrase,
    Entity,
}

/// One extracted keyword with its score
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Keyword {
    /// Lowercase, trimmed keyword
    pub keyword: String,
    /// Frequency-based score; entity surface forms carry a 1.5x boost
    pub score: f64,
    /// Derivation of this keyword
    #[serde(rename = "type")]
    pub keyword_type: KeywordType,
}

/// Sentiment classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SentimentClass {
    Positive,
    Neutral,
    Negative,
}

/// Lexicon-based sentiment result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Sentiment {
    /// Assigned class
    pub sentiment: SentimentClass,
    /// (pos - neg) / max(1, pos + neg), in [-1, 1]
    pub score: f64,
    /// min(1.0, (pos + neg) / 10), in [0, 1]
    pub confidence: f64,
    /// Count of positive indicator words
    pub positive_indicators: usize,
    /// Count of negative indicator words
    pub negative_indicators: usize,
}

/// Numeric and unit-bearing values found in the text
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    /// Plain numbers, as floats
    pub numbers: Vec<f64>,
    /// Percentage strings, `%` included
    pub percentages: Vec<String>,
    /// Currency strings, symbol or ISO code included
    pub currencies: Vec<String>,
    /// Measurement strings, unit included
    pub measurements: Vec<String>,
}

/// Pure counting summary of a text
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub word_count: usize,
    pub char_count: usize,
    pub sentence_count: usize,
    pub avg_word_length: f64,
    pub avg_sentence_length: f64,
    pub unique_words: usize,
    /// unique_words / word_count, 0 when word_count = 0
    pub lexical_diversity: f64,
}

/// Output of a single-text analysis.
///
/// Subsystems that were not requested are absent keys, not nulls; a
/// requested-but-empty subsystem is present with an empty container.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    /// Character length of the analyzed text
    pub text_length: usize,
    /// Detected language code, "und" when undetectable
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<Keyword>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// Set only on per-text placeholders inside a batch result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// An empty result carrying only an error message, used as the
    /// input-order placeholder for a failed text inside a batch
    pub fn failed(text_length: usize, message: String) -> Self {
        Self {
            text_length,
            language: "und".to_string(),
            entities: None,
            keywords: None,
            sentiment: None,
            statistics: None,
            summary: None,
            error: Some(message),
        }
    }
}

/// One entity aggregated across a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AggregatedEntity {
    /// Lowercased surface form
    pub text: String,
    pub label: EntityLabel,
    /// Number of texts the (text, label) pair occurred in
    pub count: usize,
}

/// One keyword aggregated across a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AggregatedKeyword {
    pub keyword: String,
    /// Mean of per-text scores
    pub score: f64,
    /// Document frequency
    pub count: usize,
}

/// Sentiment distribution across a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AggregatedSentiment {
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    /// Uniformly weighted mean of per-text scores
    pub average_score: f64,
}

/// Summed and averaged counting statistics across a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AggregatedStatistics {
    pub total_word_count: usize,
    pub total_char_count: usize,
    pub total_sentence_count: usize,
    pub total_unique_words: usize,
    /// Mean of per-text average word lengths
    pub avg_word_length: f64,
    /// Mean of per-text lexical diversities
    pub avg_lexical_diversity: f64,
}

/// Output of a batch analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchAnalysisResult {
    pub total_texts: usize,
    /// Unique by (lowercase text, label), ordered by count desc then first
    /// appearance; top 50
    pub aggregated_entities: Vec<AggregatedEntity>,
    /// Unique by keyword, ordered by score desc, count desc, first
    /// appearance; top 50
    pub aggregated_keywords: Vec<AggregatedKeyword>,
    pub aggregated_sentiment: AggregatedSentiment,
    pub aggregated_statistics: AggregatedStatistics,
    /// Per-text analyses in input order
    pub individual_results: Vec<AnalysisResult>,
}

/// Capability report for `GET /api/mine/health`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyzerHealth {
    pub status: &'static str,
    /// Whether the advanced NLP model is loaded
    pub model_available: bool,
    /// Feature matrix, all callable in both modes
    pub features: AnalyzerFeatures,
}

/// Features the analyzer serves regardless of mode
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyzerFeatures {
    pub entities: bool,
    pub keywords: bool,
    pub sentiment: bool,
    pub statistics: bool,
    pub summary: bool,
    pub batch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_subsystems_are_absent_keys() {
        let result = AnalysisResult {
            text_length: 5,
            language: "eng".to_string(),
            entities: None,
            keywords: None,
            sentiment: None,
            statistics: Some(Statistics::default()),
            summary: None,
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        let obj = value.as_object().unwrap();

        assert!(!obj.contains_key("entities"));
        assert!(!obj.contains_key("keywords"));
        assert!(!obj.contains_key("sentiment"));
        assert!(!obj.contains_key("summary"));
        assert!(!obj.contains_key("error"));
        // Requested-but-empty stays present with empty containers.
        assert!(obj.contains_key("statistics"));
        assert_eq!(value["statistics"]["numbers"], serde_json::json!([]));
    }

    #[test]
    fn test_options_defaults() {
        let options: AnalyzeOptions = serde_json::from_str("{}").unwrap();
        assert!(options.include_entities);
        assert!(options.include_summary);
        assert_eq!(options.top_keywords, 10);
    }

    #[test]
    fn test_top_keywords_bounds() {
        use validator::Validate;
        for valid in [1usize, 10, 50] {
            let options = AnalyzeOptions {
                top_keywords: valid,
                ..Default::default()
            };
            assert!(options.validate().is_ok(), "{valid} should be accepted");
        }
        for invalid in [0usize, 51, 100] {
            let options = AnalyzeOptions {
                top_keywords: invalid,
                ..Default::default()
            };
            assert!(options.validate().is_err(), "{invalid} should be rejected");
        }
    }

    #[test]
    fn test_entity_label_serialization() {
        assert_eq!(
            serde_json::to_value(EntityLabel::Gpe).unwrap(),
            serde_json::json!("GPE")
        );
        assert_eq!(
            serde_json::to_value(KeywordType::NounPhrase).unwrap(),
            serde_json::json!("noun_phrase")
        );
    }
}
