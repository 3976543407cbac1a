//! Text embedding backends.
//!
//! The embedding model is pluggable behind a single `embed` capability: a
//! finalfusion word-embedding file when one is configured, and a
//! deterministic hash projection otherwise. Every vector leaving this module
//! is L2-normalized, so downstream similarity is a plain dot product. A
//! bounded FIFO cache memoizes embeddings by exact text.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::sync::{LazyLock, Mutex};

use anyhow::{Context, Result};
use finalfusion::prelude::*;
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;

use crate::config::Config;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").expect("Failed to compile WORD_RE");
}

/// L2-normalizes a vector in place; zero vectors are left untouched
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in vector.iter_mut() {
            *component /= norm;
        }
    }
}

/// FNV-1a 32-bit hash of a text
fn fnv1a(text: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in text.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Deterministic fallback embedder.
///
/// `v[i] = sin(hash + i) * cos(hash * 0.1 + i * 0.01)`, L2-normalized. Not a
/// semantic model: it keeps the index usable and reproducible when no model
/// file is configured.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let hash = fnv1a(text.trim()) as f64;
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let i = i as f64;
                ((hash + i).sin() * (hash * 0.1 + i * 0.01).cos()) as f32
            })
            .collect();
        normalize(&mut vector);
        vector
    }
}

/// Word-embedding model backend (finalfusion formats)
pub struct ModelEmbedder {
    embeddings: Embeddings<VocabWrap, StorageWrap>,
    dimension: usize,
}

impl ModelEmbedder {
    /// Loads a finalfusion embedding file
    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
        let mut reader = BufReader::new(file);
        let embeddings = Embeddings::read_embeddings(&mut reader)
            .with_context(|| format!("Failed to read embeddings from {}", path))?;
        let dimension = embeddings.dims();
        Ok(Self {
            embeddings,
            dimension,
        })
    }

    /// Mean of word vectors, L2-normalized. Texts with no in-vocabulary
    /// word fall back to the hash projection at the model's dimension so
    /// the result is still deterministic and unit-length.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimension];
        let mut matched = 0usize;

        for token in WORD_RE.find_iter(text) {
            let word = token.as_str().to_lowercase();
            if let Some(embedding) = self.embeddings.embedding(&word) {
                for (acc, component) in sum.iter_mut().zip(embedding.iter()) {
                    *acc += component;
                }
                matched += 1;
            }
        }

        if matched == 0 {
            return HashEmbedder::new(self.dimension).embed(text);
        }

        for component in sum.iter_mut() {
            *component /= matched as f32;
        }
        normalize(&mut sum);
        sum
    }
}

/// The pluggable embedding capability
pub enum Embedder {
    Model(ModelEmbedder),
    Hash(HashEmbedder),
}

impl Embedder {
    /// Builds the embedder the configuration asks for, degrading to the
    /// hash fallback when the model file is missing or unreadable
    fn init() -> Self {
        let config = Config::global();
        if !config.embed_path.is_empty() {
            match ModelEmbedder::load(&config.embed_path) {
                Ok(model) => {
                    info!(
                        "Embedding model loaded from {} ({} dimensions)",
                        config.embed_path, model.dimension
                    );
                    return Self::Model(model);
                }
                Err(e) => {
                    warn!("Embedding model unavailable ({}); using hash fallback", e);
                }
            }
        }
        Self::Hash(HashEmbedder::new(config.rag_embedding_dim))
    }

    /// Gets the global embedder, loading the model on first use
    pub fn global() -> &'static Embedder {
        static EMBEDDER: LazyLock<Embedder> = LazyLock::new(Embedder::init);
        &EMBEDDER
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        match self {
            Self::Model(model) => model.embed(text),
            Self::Hash(hash) => hash.embed(text),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Model(model) => model.dimension,
            Self::Hash(hash) => hash.dimension,
        }
    }

    pub fn model_available(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}

/// Bounded text-to-vector cache with insertion-order eviction
struct EmbeddingCache {
    map: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.map.get(text).cloned()
    }

    fn insert(&mut self, text: String, vector: Vec<f32>) {
        if self.map.contains_key(&text) {
            return;
        }
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(text.clone());
        self.map.insert(text, vector);
    }
}

static CACHE: LazyLock<Mutex<EmbeddingCache>> =
    LazyLock::new(|| Mutex::new(EmbeddingCache::new(Config::global().embedding_cache_capacity)));

/// Embeds `text`, memoizing by exact text
pub fn embed_cached(embedder: &Embedder, text: &str) -> Vec<f32> {
    if let Ok(cache) = CACHE.lock() {
        if let Some(hit) = cache.get(text) {
            return hit;
        }
    }

    let vector = embedder.embed(text);
    if let Ok(mut cache) = CACHE.lock() {
        cache.insert(text.to_string(), vector.clone());
    }
    vector
}
