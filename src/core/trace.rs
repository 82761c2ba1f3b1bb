//! Request-scoped observability.
//!
//! A `MatchTrace` is created per request and threaded through every stage;
//! the assembler turns it into the response metadata.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::core::filters::FilterCondition;
use crate::models::{MetadataSource, ResumeMetadata};

/// Result of a stage that may fall back to a weaker signal instead of failing
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Complete(T),
    Degraded { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Complete(value) => value,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Complete(value) => value,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }
}

/// Per-request record of what the pipeline did
#[derive(Debug, Clone)]
pub struct MatchTrace {
    pub request_id: Uuid,
    started: Instant,
    pub resume_metadata: ResumeMetadata,
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
}

impl MatchTrace {
    pub fn new(similarity_threshold: f64, top_k: usize, candidate_pool: usize) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started: Instant::now(),
            resume_metadata: ResumeMetadata::empty(),
            metadata_source: MetadataSource::Extracted,
            filters_applied: Vec::new(),
            similarity_threshold,
            top_k,
            candidate_pool,
            query_results_count: 0,
            retrieval_method: String::new(),
            reranking_method: "none".to_string(),
            degradations: Vec::new(),
            stage_timings_ms: BTreeMap::new(),
        }
    }

    /// Record the wall time of a stage that started at `since`
    pub fn record_stage(&mut self, stage: &str, since: Instant) {
        self.record_duration(stage, since.elapsed());
    }

    pub fn record_duration(&mut self, stage: &str, elapsed: Duration) {
        self.stage_timings_ms
            .insert(stage.to_string(), elapsed.as_millis() as u64);
    }

    pub fn record_degradation(&mut self, stage: &str, reason: &str) {
        self.degradations.push(format!("{}: {}", stage, reason));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outcome_accessors() {
        let complete = StageOutcome::Complete(3);
        assert!(!complete.is_degraded());
        assert_eq!(*complete.value(), 3);

        let degraded = StageOutcome::Degraded {
            value: 0,
            reason: "timeout".to_string(),
        };
        assert!(degraded.is_degraded());
        assert_eq!(degraded.into_value(), 0);
    }

    #[test]
    fn test_trace_records_stages_and_degradations() {
        let mut trace = MatchTrace::new(0.5, 10, 30);
        trace.record_stage("retrieval", Instant::now());
        trace.record_degradation("reranking", "service unavailable");

        assert!(trace.stage_timings_ms.contains_key("retrieval"));
        assert_eq!(trace.degradations, vec!["reranking: service unavailable"]);
        assert_eq!(trace.reranking_method, "none");
    }
}
