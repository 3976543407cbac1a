//! Server implementation for the application.

pub mod error;
pub mod routes;
pub mod state;

/// Runs the HTTP server with all necessary components initialized.
pub async fn run_server() -> std::io::Result<()> {
    use crate::config::Config;
    use actix_web::middleware::{Compress, Logger, NormalizePath, TrailingSlash};
    use actix_web::web::{Data, PayloadConfig};
    use actix_web::{web, App, HttpServer};
    use std::time::Duration;
    use tokio::signal;
    use tokio::signal::unix::{signal, SignalKind};

    let config = Config::global().clone();
    let app_state = state::AppState::new(config.clone());
    let app_state_data = Data::new(app_state);

    let bind_address = (config.host.clone(), config.port);
    log::info!(
        "Listening on http://{}:{} ({} workers)",
        config.host,
        config.port,
        config.workers
    );

    let server_config = config.clone();
    let server = HttpServer::new(move || {
        let config = server_config.clone();
        App::new()
            .wrap(Compress::default())
            .wrap(NormalizePath::new(TrailingSlash::MergeOnly))
            .wrap(Logger::default())
            .app_data(web::JsonConfig::default().limit(config.max_query_size_mb * 1024 * 1024))
            .app_data(PayloadConfig::new(config.max_document_size_mb * 1024 * 1024))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure_routes(cfg, app_state_data.clone()))
    })
    .client_request_timeout(Duration::from_secs(config.request_timeout_secs))
    .workers(config.workers)
    .bind(bind_address)?
    .run();

    // Set up signal handling for graceful shutdown
    let mut terminate_signal = match signal(SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => {
            eprintln!("Failed to bind SIGTERM: {:?}", e);
            std::process::exit(1);
        }
    };
    let sigint = signal::ctrl_c();

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                eprintln!("Server error: {}", e);
            }
        }
        res = sigint => {
            match res {
                Ok(()) => log::info!("Received Ctrl+C, initiating graceful shutdown"),
                Err(e) => eprintln!("Error receiving Ctrl+C signal: {:?}", e),
            }
        }
        res = terminate_signal.recv() => {
            if res.is_some() {
                log::info!("Received termination signal, initiating graceful shutdown");
            }
        }
    }

    Ok(())
}
