//! Embedding generation. Failure here is terminal: retrieval cannot run
//! without a vector.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::core::document::truncate_chars;
use crate::error::{DependencyKind, MatchError};
use crate::models::Embedding;
use crate::services::{with_retry, CacheKey, EmbeddingCache, RetryPolicy, ServiceError};

/// Rough token estimate used for the input budget
const CHARS_PER_TOKEN: usize = 4;

/// A dense-vector embedding model
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// Model identifier, part of the cache key
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

#[derive(Clone)]
pub struct EmbeddingGenerator {
    source: Arc<dyn EmbeddingSource>,
    policy: RetryPolicy,
    dimension: usize,
    max_tokens: usize,
    cache: Option<EmbeddingCache>,
}

impl EmbeddingGenerator {
    pub fn new(
        source: Arc<dyn EmbeddingSource>,
        policy: RetryPolicy,
        dimension: usize,
        max_tokens: usize,
        cache: Option<EmbeddingCache>,
    ) -> Self {
        Self {
            source,
            policy,
            dimension,
            max_tokens,
            cache,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed the start of `text` that fits the token budget
    pub async fn generate(&self, text: &str) -> Result<Embedding, MatchError> {
        let input = truncate_to_budget(text, self.max_tokens);
        let key = CacheKey::embedding(self.source.model(), &input);

        if let Some(cache) = &self.cache {
            if let Some(values) = cache.get(&key).await {
                return Ok(Embedding::new(values.as_ref().clone()));
            }
        }

        let values = with_retry("embedding", self.policy, || self.source.embed(&input))
            .await
            .map_err(|e| {
                error!("Embedding generation failed: {}", e);
                MatchError::dependency(
                    DependencyKind::EmbeddingFailed,
                    format!("Embedding service unavailable: {}", e),
                )
            })?;

        self.validate(&values)?;
        debug!("Generated {}-dim embedding from {} chars", values.len(), input.len());

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::new(values.clone())).await;
        }

        Ok(Embedding::new(values))
    }

    fn validate(&self, values: &[f32]) -> Result<(), MatchError> {
        if values.len() != self.dimension {
            return Err(MatchError::dependency(
                DependencyKind::EmbeddingFailed,
                format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    values.len()
                ),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::dependency(
                DependencyKind::EmbeddingFailed,
                "Embedding contains non-finite values",
            ));
        }
        Ok(())
    }
}

/// Deterministic truncation from the start of the document
pub fn truncate_to_budget(text: &str, max_tokens: usize) -> String {
    let (truncated, _) = truncate_chars(text.to_string(), max_tokens.saturating_mul(CHARS_PER_TOKEN));
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingSource {
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
        output: Vec<f32>,
        failures_before_success: usize,
    }

    impl RecordingSource {
        fn new(output: Vec<f32>, failures_before_success: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
                output,
                failures_before_success,
            }
        }
    }

    #[async_trait]
    impl EmbeddingSource for RecordingSource {
        fn model(&self) -> &str {
            "recording"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(text.to_string());
            if call < self.failures_before_success {
                return Err(ServiceError::Unavailable("embedding offline".to_string()));
            }
            Ok(self.output.clone())
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generates_fixed_dimension() {
        let source = Arc::new(RecordingSource::new(vec![1.0, 0.0, 0.0], 0));
        let generator = EmbeddingGenerator::new(source, policy(), 3, 100, None);

        let embedding = generator.generate("Senior Go engineer").await.unwrap();
        assert_eq!(embedding.dimension(), 3);
    }

    #[tokio::test]
    async fn test_retries_once_then_succeeds() {
        let source = Arc::new(RecordingSource::new(vec![1.0, 0.0], 1));
        let generator = EmbeddingGenerator::new(source.clone(), policy(), 2, 100, None);

        assert!(generator.generate("text").await.is_ok());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let source = Arc::new(RecordingSource::new(vec![1.0, 0.0], 5));
        let generator = EmbeddingGenerator::new(source.clone(), policy(), 2, 100, None);

        let err = generator.generate("text").await.unwrap_err();
        assert_eq!(err.kind(), "EmbeddingFailed");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails() {
        let source = Arc::new(RecordingSource::new(vec![1.0, 0.0], 0));
        let generator = EmbeddingGenerator::new(source, policy(), 3, 100, None);

        let err = generator.generate("text").await.unwrap_err();
        assert_eq!(err.kind(), "EmbeddingFailed");
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_input_truncated_from_start() {
        let source = Arc::new(RecordingSource::new(vec![1.0], 0));
        let generator = EmbeddingGenerator::new(source.clone(), policy(), 1, 2, None);

        generator.generate("abcdefghijklmnop").await.unwrap();
        assert_eq!(source.inputs.lock().unwrap()[0], "abcdefgh");
    }

    #[tokio::test]
    async fn test_cache_skips_second_call() {
        let source = Arc::new(RecordingSource::new(vec![0.5, 0.5], 0));
        let cache = EmbeddingCache::new(10, 60);
        let generator = EmbeddingGenerator::new(source.clone(), policy(), 2, 100, cache);

        let first = generator.generate("same resume").await.unwrap();
        let second = generator.generate("same resume").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
