//! Export engine.
//!
//! Materializes cached paragraph records into CSV or JSONL artifacts,
//! optionally enriched with NLP columns, and serves them back for download.

pub mod handlers;
pub mod types;
pub mod writer;

use actix_web::web;

/// Configure export routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/export").route(web::post().to(handlers::export)))
        .service(web::resource("/export/{file_id}").route(web::get().to(handlers::download)));
}
