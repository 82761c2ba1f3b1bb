//! In-process job index over a `jobs.json` corpus.
//!
//! Exact cosine scan with the same filter semantics as the hosted index,
//! except that string comparison is case-insensitive.

use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::ServiceError;
use crate::core::retrieval::{IndexQuery, VectorIndex};
use crate::core::similarity::cosine_similarity;
use crate::models::{JobAttributes, JobCandidate};

/// Errors that can occur when loading a job corpus
#[derive(Debug, Error)]
pub enum IndexLoadError {
    #[error("Failed to read job corpus: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse job corpus: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Job {job_id} has a {actual}-dim embedding, expected {expected}")]
    Dimension {
        job_id: String,
        expected: usize,
        actual: usize,
    },
}

/// One posting in the corpus file
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    #[serde(alias = "id")]
    pub job_id: String,
    #[serde(alias = "values")]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: JobAttributes,
}

#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    records: Vec<JobRecord>,
}

impl InMemoryIndex {
    /// Build an index, rejecting any record whose vector has the wrong dimension
    pub fn from_records(records: Vec<JobRecord>, dimension: usize) -> Result<Self, IndexLoadError> {
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(IndexLoadError::Dimension {
                job_id: bad.job_id.clone(),
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self { records })
    }

    /// Load a JSON array of records from `path`
    pub fn load<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self, IndexLoadError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<JobRecord> = serde_json::from_str(&raw)?;
        let index = Self::from_records(records, dimension)?;
        info!(
            "Loaded {} jobs from {}",
            index.len(),
            path.as_ref().display()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<JobCandidate>, ServiceError> {
        let vector = query.vector.as_slice();

        let mut scored: Vec<(&JobRecord, f64)> = self
            .records
            .iter()
            .filter(|record| query.filter.matches(&record.metadata))
            .map(|record| (record, cosine_similarity(vector, &record.embedding)))
            .collect();

        // Stable: ties keep corpus order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(query.top_n);

        Ok(scored
            .into_iter()
            .map(|(record, similarity)| {
                JobCandidate::new(record.job_id.clone(), similarity, record.metadata.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::derive_filters;
    use crate::models::{Embedding, ResumeMetadata};

    fn record(id: &str, embedding: Vec<f32>, category: &str) -> JobRecord {
        JobRecord {
            job_id: id.to_string(),
            embedding,
            metadata: JobAttributes {
                job_category: category.to_string(),
                ..Default::default()
            },
        }
    }

    fn index() -> InMemoryIndex {
        InMemoryIndex::from_records(
            vec![
                record("first", vec![1.0, 0.0], "Engineering"),
                record("orthogonal", vec![0.0, 1.0], "Engineering"),
                record("twin", vec![2.0, 0.0], "Sales"),
            ],
            2,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ranks_by_cosine_with_stable_ties() {
        let query = IndexQuery {
            vector: Embedding::new(vec![1.0, 0.0]),
            filter: Default::default(),
            top_n: 10,
        };

        let candidates = index().query(&query).await.unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.job_id.as_str()).collect();

        assert_eq!(ids, vec!["first", "twin", "orthogonal"]);
        assert!((candidates[0].raw_similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_filter_is_case_insensitive() {
        let filter = derive_filters(&ResumeMetadata {
            preferred_job_categories: vec!["sales".to_string()],
            ..Default::default()
        });
        let query = IndexQuery {
            vector: Embedding::new(vec![1.0, 0.0]),
            filter,
            top_n: 10,
        };

        let candidates = index().query(&query).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].job_id, "twin");
    }

    #[tokio::test]
    async fn test_top_n_cut() {
        let query = IndexQuery {
            vector: Embedding::new(vec![1.0, 0.0]),
            filter: Default::default(),
            top_n: 1,
        };
        assert_eq!(index().query(&query).await.unwrap().len(), 1);
    }

    #[test]
    fn test_dimension_checked_at_load() {
        let err = InMemoryIndex::from_records(vec![record("short", vec![1.0], "Engineering")], 2).unwrap_err();
        assert!(matches!(err, IndexLoadError::Dimension { actual: 1, expected: 2, .. }));
    }

    #[test]
    fn test_record_accepts_pinecone_style_keys() {
        let records: Vec<JobRecord> = serde_json::from_str(
            r#"[{"id": "job-1", "values": [0.5, 0.5], "metadata": {"company_name": "Acme", "yoe_min": 2, "status": "active"}}]"#,
        )
        .unwrap();

        assert_eq!(records[0].job_id, "job-1");
        assert_eq!(records[0].metadata.company_name, "Acme");
        assert!(!records[0].metadata.h1b_sponsorship);
    }
}
