//! Dataset templates.
//!
//! Declarative descriptions of downstream dataset shapes, plus the pure
//! validation lint applied to them.

pub mod handlers;
pub mod types;
pub mod validate;

use actix_web::web;

/// Configure template routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dataset")
            .service(web::resource("/templates/validate").route(web::post().to(handlers::validate))),
    );
}
