//! Sentence embeddings via fastembed (ONNX-based, local, no API key).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use anyhow::Result;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use lru::LruCache;
use tracing::{debug, info, warn};

const DEFAULT_CACHE_SIZE: usize = 10_000;

pub struct EmbeddingService {
    model: Mutex<TextEmbedding>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingService {
    /// Load the embedding model. Downloads it on first use.
    pub fn new(model_name: &str) -> Result<Self> {
        Self::with_cache_size(model_name, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(model_name: &str, cache_size: usize) -> Result<Self> {
        let model_type = match model_name {
            "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            _ => anyhow::bail!(
                "unsupported embedding model '{}'; use BAAI/bge-small-en-v1.5 or BAAI/bge-base-en-v1.5",
                model_name
            ),
        };

        let model = TextEmbedding::try_new(
            TextInitOptions::new(model_type).with_show_download_progress(true),
        )?;
        info!(
            "embedding model loaded: {} (cache_size={})",
            model_name, cache_size
        );

        let cap = NonZeroUsize::new(cache_size.max(1)).unwrap();
        Ok(Self {
            model: Mutex::new(model),
            cache: Mutex::new(LruCache::new(cap)),
        })
    }

    /// Embed multiple texts in one batch call. Not cached — used for
    /// per-item indexing, where each text is assumed unique.
    pub fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let docs: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let mut model = self.model.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(model.embed(docs, None)?)
    }

    /// Embed a single query or label string, consulting the LRU cache first.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        {
            let mut cache = self.cache.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            if let Some(cached) = cache.get(query) {
                debug!("embedding cache hit (len={})", query.len());
                return Ok(cached.clone());
            }
        }

        let embedding = {
            let mut model = self.model.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            let embeddings = model.embed(vec![query.to_string()], None)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("empty embedding result"))?
        };

        let mut cache = self.cache.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
        cache.put(query.to_string(), embedding.clone());
        Ok(embedding)
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map_or(0, |c| c.len())
    }
}

/// Text-to-vector boundary the rest of the core depends on, so callers that
/// don't need a real model (tests, mostly) can supply a synthetic one without
/// loading fastembed.
pub trait Embedder: Send + Sync {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

impl Embedder for EmbeddingService {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        EmbeddingService::embed_query(self, text)
    }
}

/// Lazy wrapper that loads the model in the background so a slow first
/// download never blocks the health probe or early requests (which fall
/// back to rule-only behavior until `is_ready()`).
pub struct LazyEmbeddingService {
    cell: std::sync::Arc<tokio::sync::OnceCell<EmbeddingService>>,
}

impl LazyEmbeddingService {
    pub fn new(model_name: String, cache_size: usize) -> Self {
        let cell = std::sync::Arc::new(tokio::sync::OnceCell::new());
        let cell_clone = cell.clone();
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || {
                EmbeddingService::with_cache_size(&model_name, cache_size)
            })
            .await
            {
                Ok(Ok(svc)) => {
                    let _ = cell_clone.set(svc);
                    info!("embedding model initialized (background)");
                }
                Ok(Err(e)) => warn!("embedding init failed: {}", e),
                Err(e) => warn!("embedding init panicked: {}", e),
            }
        });
        Self { cell }
    }

    pub fn get(&self) -> Option<&EmbeddingService> {
        self.cell.get()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Embedder for LazyEmbeddingService {
    /// Delegates to the underlying model once loaded. Before that, returns
    /// `EmbeddingFailure` so callers degrade to rule-only behavior instead of
    /// blocking on the background load.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        match self.get() {
            Some(svc) => svc.embed_query(text),
            None => Err(crate::errors::AppError::EmbeddingFailure(
                "embedding model not yet loaded".to_string(),
            )
            .into()),
        }
    }
}

/// Cosine similarity between two vectors. Unlike a raw dot product, this
/// divides by the product of norms: the vectors produced here are not
/// guaranteed to be L2-normalized.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Serialize an embedding vector to little-endian bytes for BLOB storage.
pub fn serialize_embedding(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for &val in v {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Deserialize an embedding from little-endian bytes.
pub fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        anyhow::bail!(
            "invalid embedding blob: {} bytes (not a multiple of 4)",
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap();
            f32::from_le_bytes(arr)
        })
        .collect())
}
