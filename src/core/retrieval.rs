//! Retrieval engine: k-nearest postings for a resume embedding.
//!
//! Filters are applied as-is. When they exclude everything the engine
//! returns an empty sequence rather than widening them; loosening filters is
//! a caller decision.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error};

use crate::core::filters::MetadataFilter;
use crate::error::{DependencyKind, MatchError};
use crate::models::{Embedding, JobCandidate};
use crate::services::{with_retry, RetryPolicy, ServiceError};

/// Nearest-neighbour query against the job index
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub vector: Embedding,
    pub filter: MetadataFilter,
    pub top_n: usize,
}

/// A searchable index of job postings, ranked by cosine similarity
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend name reported in response metadata
    fn name(&self) -> &str;

    async fn query(&self, query: &IndexQuery) -> Result<Vec<JobCandidate>, ServiceError>;
}

/// Candidates in descending raw-similarity order
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub candidates: Vec<JobCandidate>,
    pub method: String,
}

#[derive(Clone)]
pub struct RetrievalEngine {
    index: Arc<dyn VectorIndex>,
    policy: RetryPolicy,
}

impl RetrievalEngine {
    pub fn new(index: Arc<dyn VectorIndex>, policy: RetryPolicy) -> Self {
        Self { index, policy }
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Fetch up to `top_n` candidates matching `filter`
    pub async fn retrieve(
        &self,
        embedding: &Embedding,
        filter: &MetadataFilter,
        top_n: usize,
    ) -> Result<Retrieval, MatchError> {
        let query = IndexQuery {
            vector: embedding.clone(),
            filter: filter.clone(),
            top_n,
        };

        let mut candidates = with_retry("vector query", self.policy, || self.index.query(&query))
            .await
            .map_err(|e| {
                error!("Vector index query failed on {}: {}", self.index.name(), e);
                MatchError::dependency(
                    DependencyKind::RetrievalUnavailable,
                    format!("Job index unavailable: {}", e),
                )
            })?;

        // Stable: equal similarities keep the index's order
        candidates.sort_by(|a, b| {
            b.raw_similarity
                .partial_cmp(&a.raw_similarity)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(top_n);

        debug!(
            "Retrieved {} candidates from {} ({} filter conditions)",
            candidates.len(),
            self.index.name(),
            filter.conditions.len()
        );

        Ok(Retrieval {
            candidates,
            method: retrieval_method(self.index.name(), filter),
        })
    }
}

pub fn retrieval_method(index: &str, filter: &MetadataFilter) -> String {
    if filter.is_empty() {
        format!("{}:cosine", index)
    } else {
        format!("{}:cosine+filter", index)
    }
}
