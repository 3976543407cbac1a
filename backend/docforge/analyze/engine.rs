//! Analyzer engine and model lifecycle.
//!
//! The engine is a process-wide singleton loaded lazily on first use. When a
//! gazetteer model directory is configured and readable the analyzer runs in
//! model mode; otherwise every operation stays callable through the
//! regex/lexicon fallback. The mode is advertised through the health
//! endpoint, never through errors.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::{info, warn};

use super::types::{AnalysisResult, AnalyzeOptions, EntityLabel};
use super::{entities, keywords, sentiment, statistics, summary};
use crate::config::Config;
use crate::server::error::AppError;

/// Files read from the model directory, one label each
const GAZETTEER_FILES: &[(&str, EntityLabel)] = &[
    ("person.txt", EntityLabel::Person),
    ("org.txt", EntityLabel::Org),
    ("gpe.txt", EntityLabel::Gpe),
    ("product.txt", EntityLabel::Product),
    ("event.txt", EntityLabel::Event),
];

/// Surface-form lists backing model-mode entity recognition
pub struct Gazetteer {
    entries: Vec<(String, EntityLabel)>,
}

impl Gazetteer {
    /// Loads every gazetteer file present under `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for (file, label) in GAZETTEER_FILES {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read gazetteer file {}", path.display()))?;
            for line in contents.lines() {
                let surface = line.trim();
                if !surface.is_empty() {
                    entries.push((surface.to_string(), *label));
                }
            }
        }

        if entries.is_empty() {
            anyhow::bail!("model directory {} holds no gazetteer entries", dir.display());
        }

        // Longest-first so longer surface forms win overlap resolution.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        entries.dedup();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, EntityLabel)] {
        &self.entries
    }
}

/// The process-wide analyzer
pub struct NlpEngine {
    gazetteer: Option<Gazetteer>,
}

static ENGINE: LazyLock<NlpEngine> = LazyLock::new(NlpEngine::init);

impl NlpEngine {
    fn init() -> Self {
        let model_dir = &Config::global().model_dir;
        let gazetteer = if model_dir.is_empty() {
            None
        } else {
            match Gazetteer::load(Path::new(model_dir)) {
                Ok(g) => {
                    info!(
                        "NLP model loaded from {}: {} gazetteer entries",
                        model_dir,
                        g.entries.len()
                    );
                    Some(g)
                }
                Err(e) => {
                    // Degraded mode, not an error: the fallback path serves
                    // every operation.
                    warn!("NLP model unavailable ({}); running in fallback mode", e);
                    None
                }
            }
        };
        Self { gazetteer }
    }

    /// Gets the global engine instance, loading the model on first use
    pub fn global() -> &'static NlpEngine {
        &ENGINE
    }

    /// A fallback-mode engine for tests, bypassing the global singleton
    #[cfg(test)]
    pub fn test_instance() -> Self {
        Self { gazetteer: None }
    }

    /// Whether the advanced model is loaded
    pub fn model_available(&self) -> bool {
        self.gazetteer.is_some()
    }

    /// Runs the requested subsystems over one text.
    ///
    /// Subsystem failures are contained: the failed subsystem's key is
    /// absent from the result and a warning is logged; the others still run.
    /// Only caller-visible conditions (oversized input) surface as errors.
    pub fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<AnalysisResult, AppError> {
        let max = Config::global().max_size_document;
        if text.len() > max {
            return Err(AppError::InvalidInput(format!(
                "text is {} bytes, limit is {}",
                text.len(),
                max
            )));
        }

        let language = whatlang::detect(text)
            .map(|info| info.lang().code().to_string())
            .unwrap_or_else(|| "und".to_string());

        let mut result = AnalysisResult {
            text_length: text.chars().count(),
            language,
            entities: None,
            keywords: None,
            sentiment: None,
            statistics: None,
            summary: None,
            error: None,
        };

        // Each subsystem runs behind a panic boundary: a failure drops only
        // that subsystem's key and logs a warning.
        fn contained<T>(name: &str, run: impl FnOnce() -> T) -> Option<T> {
            match catch_unwind(AssertUnwindSafe(run)) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("analyzer subsystem '{}' failed; omitting its output", name);
                    None
                }
            }
        }

        if options.include_entities {
            result.entities = contained("entities", || {
                entities::extract_entities(text, self.gazetteer.as_ref())
            });
        }

        if options.include_keywords {
            let entity_spans = result.entities.clone();
            result.keywords = contained("keywords", || {
                keywords::extract_keywords(
                    text,
                    entity_spans.as_deref(),
                    options.top_keywords,
                    self.model_available(),
                )
            });
        }

        if options.include_sentiment {
            result.sentiment = contained("sentiment", || sentiment::score_sentiment(text));
        }

        if options.include_statistics {
            result.statistics =
                contained("statistics", || statistics::extract_statistics(text));
        }

        if options.include_summary {
            result.summary = contained("summary", || summary::summarize(text));
        }

        Ok(result)
    }
}
