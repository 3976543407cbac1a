//! Application route configuration and endpoint registration.
//!
//! All API endpoints live under `/api`, grouped by feature module; each
//! module contributes its own routes through a `configure_routes` hook.
//! Swagger documentation is mounted only when `do_openapi` is set.

use actix_web::web::Data;
use actix_web::{web, web::ServiceConfig, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::docforge;
use crate::server::state::AppState;

/// Liveness probe; also what the lifecycle manager polls after spawning us
async fn api_health(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "uptime_secs": state.uptime_secs(),
    }))
}

/// Sets up all API routes for the application
pub fn configure_routes(config: &mut ServiceConfig, app_state: Data<AppState>) {
    let api_scope = web::scope("/api")
        .app_data(app_state)
        .route("/health", web::get().to(api_health))
        .configure(docforge::extract::configure_routes)
        .configure(docforge::analyze::configure_routes)
        .configure(docforge::templates::configure_routes)
        .configure(docforge::export::configure_routes)
        .configure(docforge::rag::configure_routes);

    config.service(api_scope);

    if Config::global().do_openapi {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        config.service(
            SwaggerUi::new("/docs/{_:.*}")
                .url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }
}
