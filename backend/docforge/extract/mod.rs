//! Paragraph extraction pipeline.
//!
//! Turns raw PDF/EPUB bytes into ordered paragraph records with page numbers
//! and deterministic enrichment metadata. The records produced here are the
//! canonical unit every other subsystem consumes.

pub mod enrich;
pub mod epub;
pub mod handlers;
pub mod pdf;
pub mod processing;
pub mod types;

pub use types::{ParagraphRecord, ParsedDocument};

use actix_web::web;

/// Configure extraction routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/upload").route(web::post().to(handlers::upload_file)))
        .service(web::resource("/parse").route(web::post().to(handlers::parse_file)));
}
