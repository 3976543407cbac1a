#![allow(dead_code)]

mod config;
mod openapi;
mod server;

mod docforge {
    pub mod analyze;
    pub mod cache;
    pub mod export;
    pub mod extract;
    pub mod rag;
    pub mod templates;
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    simple_logger::init_with_env().ok();

    // Load the persisted vector index before serving requests.
    docforge::rag::initialize().await;

    let result = server::run_server().await;

    // Flush the index on the way out.
    docforge::rag::shutdown().await;

    result
}
