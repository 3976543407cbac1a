//! Application configuration management.
//!
//! This module provides centralized configuration loading and validation,
//! converting environment variables into a strongly-typed `Config` struct.
//! It ensures consistent settings across the application and eliminates
//! the need for scattered `std::env::var` calls throughout the codebase.

use actix_web::web;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::Arc;
use std::{env, fmt};

lazy_static! {
    /// Global static configuration loaded at application startup
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load().expect("Failed to load configuration"));
}

/// Application configuration loaded from environment variables
///
/// Contains all runtime settings for the service, organized by category.
/// Every value has a default so the server starts without a `.env` file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Bind address
    /// Host the HTTP server binds to
    pub host: String,

    /// Port the HTTP server binds to
    pub port: u16,

    /// Number of HTTP worker threads
    pub workers: usize,

    // Storage locations
    /// Directory for raw uploaded files
    pub uploads_dir: String,

    /// Directory for parsed-result cache blobs
    pub cache_dir: String,

    /// Directory for export artifacts
    pub exports_dir: String,

    /// Path of the RAG index persistence blob
    pub rag_index_path: String,

    // NLP model locations
    /// Path to a finalfusion word-embedding file; empty disables the model
    pub embed_path: String,

    /// Directory holding NER gazetteer files; empty disables the model
    pub model_dir: String,

    // Size limits
    /// Maximum size for query JSON payloads in megabytes
    pub max_query_size_mb: usize,

    /// Maximum size for document uploads in megabytes
    pub max_document_size_mb: usize,

    /// Maximum analyzer input length in bytes
    pub max_size_document: usize,

    /// Maximum number of texts in one batch-analysis request
    pub max_batch_texts: usize,

    // RAG settings
    /// Embedding dimension used by the hash embedder
    pub rag_embedding_dim: usize,

    /// Capacity of the text-to-vector embedding cache
    pub embedding_cache_capacity: usize,

    /// Persistence writes larger than this many bytes are skipped
    pub rag_max_persist_bytes: usize,

    // Request handling
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    // OpenAPI settings
    /// Whether to enable OpenAPI documentation
    pub do_openapi: bool,
}

/// Errors that can occur during configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    MissingKey(&'static str),

    /// Failed to parse environment variable value
    ParseError(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingKey(key) => write!(f, "Missing environment variable: {}", key),
            ConfigError::ParseError(key, err) => write!(f, "Failed to parse {}: {}", key, err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Gets the global configuration instance
    ///
    /// This provides a reference to the lazily-initialized global configuration
    /// that's shared across the application.
    pub fn global() -> &'static Arc<Config> {
        &CONFIG
    }

    /// Creates an Actix-Web compatible Data wrapper for the configuration
    #[allow(dead_code)]
    pub fn as_data() -> web::Data<Arc<Config>> {
        web::Data::new(CONFIG.clone())
    }

    /// Loads application configuration from environment variables
    ///
    /// This function:
    /// 1. Attempts to load variables from .env file
    /// 2. Reads variables from the environment
    /// 3. Applies defaults for everything that is unset
    ///
    /// # Errors
    /// Returns `ConfigError` if a set variable fails to parse
    pub fn load() -> Result<Self, ConfigError> {
        // Load environment variables from .env, ignoring errors
        dotenvy::dotenv().ok();

        // Helper to get a String with a default value if missing
        fn get_with_default(key: &'static str, default: &str) -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        }

        // Helper to parse a value with a default
        fn parse_with_default<T: std::str::FromStr>(key: &'static str, default: T) -> T {
            env::var(key)
                .ok()
                .and_then(|s| s.parse::<T>().ok())
                .unwrap_or(default)
        }

        Ok(Config {
            // Bind address
            host: get_with_default("DOCFORGE_HOST", "127.0.0.1"),
            port: parse_with_default::<u16>("DOCFORGE_PORT", 8000),
            workers: parse_with_default::<usize>("DOCFORGE_WORKERS", 2),

            // Storage locations
            uploads_dir: get_with_default("UPLOADS_DIR", "storage/uploads"),
            cache_dir: get_with_default("CACHE_DIR", "storage/cache"),
            exports_dir: get_with_default("EXPORTS_DIR", "dataset_exports"),
            rag_index_path: get_with_default("RAG_INDEX_PATH", "storage/rag/rag_index.json"),

            // NLP model locations
            embed_path: get_with_default("EMBED_PATH", ""),
            model_dir: get_with_default("MODEL_DIR", ""),

            // Size limits
            max_query_size_mb: parse_with_default::<usize>("MAX_QUERY_SIZE_MB", 10),
            max_document_size_mb: parse_with_default::<usize>("MAX_DOCUMENT_SIZE_MB", 64),
            max_size_document: parse_with_default::<usize>("MAX_SIZE_DOCUMENT", 1_000_000),
            max_batch_texts: parse_with_default::<usize>("MAX_BATCH_TEXTS", 100),

            // RAG settings
            rag_embedding_dim: parse_with_default::<usize>("RAG_EMBEDDING_DIM", 384),
            embedding_cache_capacity: parse_with_default::<usize>("EMBEDDING_CACHE_CAPACITY", 1000),
            rag_max_persist_bytes: parse_with_default::<usize>(
                "RAG_MAX_PERSIST_BYTES",
                64 * 1024 * 1024,
            ),

            // Request handling
            request_timeout_secs: parse_with_default::<u64>("REQUEST_TIMEOUT_SECS", 30),

            // OpenAPI settings
            do_openapi: parse_with_default::<bool>("DO_OPENAPI", false),
        })
    }
}
