//! Text analytics engine.
//!
//! Entity recognition, keyword extraction, sentiment scoring, statistical
//! extraction and counting summaries over a single text, plus the batch
//! aggregator that folds per-text results into cross-text aggregates. The
//! engine degrades gracefully when no NLP model is configured: every
//! operation stays callable through the regex/lexicon fallback, and the
//! active mode is reported by the health endpoint.

pub mod batch;
pub mod engine;
pub mod entities;
pub mod handlers;
pub mod keywords;
pub mod sentiment;
pub mod statistics;
pub mod summary;
pub mod types;

pub use engine::NlpEngine;
pub use types::{AnalysisResult, AnalyzeOptions};

use actix_web::web;

/// Configure mining routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/mine")
            .service(web::resource("/analyze").route(web::post().to(handlers::analyze)))
            .service(web::resource("/batch-analyze").route(web::post().to(handlers::batch_analyze)))
            .service(web::resource("/health").route(web::get().to(handlers::health))),
    );
}
