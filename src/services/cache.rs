use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// In-process cache of resume embeddings
///
/// Identical resume text (after truncation) maps to the same vector, so
/// repeated uploads of one document skip the embedding call.
#[derive(Clone)]
pub struct EmbeddingCache {
    inner: moka::future::Cache<String, Arc<Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create a cache; `None` when `capacity` is zero
    pub fn new(capacity: u64, ttl_secs: u64) -> Option<Self> {
        if capacity == 0 {
            return None;
        }

        let inner = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Some(Self { inner })
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        let hit = self.inner.get(key).await;
        if hit.is_some() {
            tracing::trace!("Embedding cache hit: {}", key);
        }
        hit
    }

    pub async fn insert(&self, key: String, values: Arc<Vec<f32>>) {
        self.inner.insert(key, values).await;
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for the embedding of `text` under `model`
    pub fn embedding(model: &str, text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        format!("embedding:{}:{:x}", model, digest)
    }
}
