//! Retrieval-augmented-generation index.
//!
//! A content-addressable per-paragraph vector store with dataset-scoped
//! similarity search, ranked context assembly, cached embeddings and bounded
//! JSON persistence. The embedding model is pluggable; a deterministic hash
//! fallback keeps the index usable and testable without one.

pub mod embedder;
pub mod handlers;
pub mod index;
pub mod types;

pub use embedder::Embedder;
pub use index::RagIndex;

use actix_web::web;

/// Configure RAG routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rag")
            .service(
                web::resource("/index-dataset-file")
                    .route(web::post().to(handlers::index_dataset_file)),
            )
            .service(web::resource("/search").route(web::post().to(handlers::search)))
            .service(web::resource("/context").route(web::post().to(handlers::context)))
            .service(web::resource("/stats").route(web::get().to(handlers::stats)))
            .service(
                web::resource("/dataset/{dataset_id}")
                    .route(web::delete().to(handlers::remove_dataset)),
            ),
    );
}

/// Initialize the RAG system: load the persisted index
pub async fn initialize() {
    index::initialize().await;
}

/// Shutdown the RAG system: flush the index
pub async fn shutdown() {
    index::shutdown().await;
}
