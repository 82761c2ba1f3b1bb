use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::filters::FilterCondition;
use crate::models::domain::{JobMatch, ResumeMetadata};

/// Where the preferences used for filtering came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Extracted,
    Caller,
    Degraded,
}

/// Response for the match endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matches: Vec<JobMatch>,
    pub metadata: MatchMetadata,
}

/// Diagnostic metadata, always present even when `matches` is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub request_id: String,
    pub resume_metadata_extracted: ResumeMetadata,
    pub metadata_source: MetadataSource,
    pub filters_applied: Vec<FilterCondition>,
    pub similarity_threshold: f64,
    pub top_k: usize,
    pub candidate_pool: usize,
    pub query_results_count: usize,
    pub retrieval_method: String,
    pub reranking_method: String,
    pub degradations: Vec<String>,
    pub stage_timings_ms: BTreeMap<String, u64>,
    pub processing_time_ms: u64,
}

/// Response for the embed-resume endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResumeResponse {
    pub status: String,
    pub filename: String,
    pub file_size_bytes: usize,
    pub text_length: usize,
    pub page_count: Option<usize>,
    pub truncated: bool,
    pub embedding_dimension: usize,
    pub processing_time_ms: u64,
    pub resume_text: String,
    pub resume_metadata: ResumeMetadata,
    pub metadata_source: MetadataSource,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub index: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
