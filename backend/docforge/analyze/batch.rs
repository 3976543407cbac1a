//! Batch analysis and cross-text aggregation.
//!
//! Applies the analyzer to every text of a batch independently, preserving
//! input order, then folds the per-text results into aggregates: entity
//! document frequencies, keyword unions with averaged scores, a sentiment
//! distribution, and summed/averaged counting statistics.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::engine::NlpEngine;
use super::types::{
    AggregatedEntity, AggregatedKeyword, AggregatedSentiment, AggregatedStatistics,
    AnalysisResult, AnalyzeOptions, BatchAnalysisResult, EntityLabel, SentimentClass,
};
use crate::config::Config;
use crate::server::error::AppError;

/// Batches above this size run on the rayon pool
const PARALLEL_THRESHOLD: usize = 10;

/// Aggregates keep at most this many entries
const AGGREGATE_CAP: usize = 50;

/// Analyzes up to 100 texts and merges their results.
pub fn analyze_batch(
    engine: &NlpEngine,
    texts: &[String],
    options: &AnalyzeOptions,
) -> Result<BatchAnalysisResult, AppError> {
    if texts.is_empty() {
        return Err(AppError::InvalidInput(
            "batch contains no texts".to_string(),
        ));
    }
    let ceiling = Config::global().max_batch_texts;
    if texts.len() > ceiling {
        return Err(AppError::BatchTooLarge(format!(
            "batch of {} texts exceeds the ceiling of {}",
            texts.len(),
            ceiling
        )));
    }

    // A per-text failure becomes an input-order placeholder; it never aborts
    // the batch.
    let analyze_one = |text: &String| {
        engine
            .analyze(text, options)
            .unwrap_or_else(|e| AnalysisResult::failed(text.chars().count(), e.to_string()))
    };

    let individual_results: Vec<AnalysisResult> = if texts.len() > PARALLEL_THRESHOLD {
        texts.par_iter().map(analyze_one).collect()
    } else {
        texts.iter().map(analyze_one).collect()
    };

    Ok(BatchAnalysisResult {
        total_texts: texts.len(),
        aggregated_entities: aggregate_entities(&individual_results),
        aggregated_keywords: aggregate_keywords(&individual_results),
        aggregated_sentiment: aggregate_sentiment(&individual_results),
        aggregated_statistics: aggregate_statistics(&individual_results),
        individual_results,
    })
}

/// Entities merged by (lowercase surface, label); count is the number of
/// texts the pair occurred in
fn aggregate_entities(results: &[AnalysisResult]) -> Vec<AggregatedEntity> {
    let mut merged: FxHashMap<(String, EntityLabel), (usize, usize)> = FxHashMap::default();
    let mut order = 0usize;

    for result in results {
        let Some(entities) = &result.entities else {
            continue;
        };
        let mut seen_in_text: Vec<(String, EntityLabel)> = Vec::new();
        for entity in entities {
            let key = (entity.text.to_lowercase(), entity.label);
            if seen_in_text.contains(&key) {
                continue;
            }
            seen_in_text.push(key.clone());
            let entry = merged.entry(key).or_insert((0, order));
            entry.0 += 1;
            order += 1;
        }
    }

    let mut aggregated: Vec<((String, EntityLabel), (usize, usize))> =
        merged.into_iter().collect();
    aggregated.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    aggregated
        .into_iter()
        .take(AGGREGATE_CAP)
        .map(|((text, label), (count, _))| AggregatedEntity { text, label, count })
        .collect()
}

/// Keywords merged by keyword; score is the mean of per-text scores and
/// count the document frequency
fn aggregate_keywords(results: &[AnalysisResult]) -> Vec<AggregatedKeyword> {
    let mut merged: FxHashMap<String, (f64, usize, usize)> = FxHashMap::default();
    let mut order = 0usize;

    for result in results {
        let Some(keywords) = &result.keywords else {
            continue;
        };
        for keyword in keywords {
            let entry = merged
                .entry(keyword.keyword.clone())
                .or_insert((0.0, 0, order));
            entry.0 += keyword.score;
            entry.1 += 1;
            order += 1;
        }
    }

    let mut aggregated: Vec<(String, (f64, usize, usize))> = merged.into_iter().collect();
    aggregated.sort_by(|a, b| {
        let mean_a = a.1 .0 / a.1 .1 as f64;
        let mean_b = b.1 .0 / b.1 .1 as f64;
        mean_b
            .partial_cmp(&mean_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.1 .1.cmp(&a.1 .1))
            .then(a.1 .2.cmp(&b.1 .2))
    });

    aggregated
        .into_iter()
        .take(AGGREGATE_CAP)
        .map(|(keyword, (score_sum, count, _))| AggregatedKeyword {
            keyword,
            score: score_sum / count as f64,
            count,
        })
        .collect()
}

/// Class counts plus the uniformly weighted mean score
fn aggregate_sentiment(results: &[AnalysisResult]) -> AggregatedSentiment {
    let mut aggregated = AggregatedSentiment::default();
    let mut score_sum = 0.0;
    let mut scored = 0usize;

    for result in results {
        let Some(sentiment) = &result.sentiment else {
            continue;
        };
        match sentiment.sentiment {
            SentimentClass::Positive => aggregated.positive_count += 1,
            SentimentClass::Neutral => aggregated.neutral_count += 1,
            SentimentClass::Negative => aggregated.negative_count += 1,
        }
        score_sum += sentiment.score;
        scored += 1;
    }

    if scored > 0 {
        aggregated.average_score = score_sum / scored as f64;
    }
    aggregated
}

/// Totals summed; averages recomputed as the mean of per-text averages
fn aggregate_statistics(results: &[AnalysisResult]) -> AggregatedStatistics {
    let mut aggregated = AggregatedStatistics::default();
    let mut word_length_sum = 0.0;
    let mut diversity_sum = 0.0;
    let mut summarized = 0usize;

    for result in results {
        let Some(summary) = &result.summary else {
            continue;
        };
        aggregated.total_word_count += summary.word_count;
        aggregated.total_char_count += summary.char_count;
        aggregated.total_sentence_count += summary.sentence_count;
        aggregated.total_unique_words += summary.unique_words;
        word_length_sum += summary.avg_word_length;
        diversity_sum += summary.lexical_diversity;
        summarized += 1;
    }

    if summarized > 0 {
        aggregated.avg_word_length = word_length_sum / summarized as f64;
        aggregated.avg_lexical_diversity = diversity_sum / summarized as f64;
    }
    aggregated
}
