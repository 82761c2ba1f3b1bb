use crate::core::trace::MatchTrace;
use crate::models::{JobMatch, MatchMetadata, MatchResponse};

/// Combine ranked matches with the request trace into the response
///
/// Metadata is always populated, including when `matches` is empty.
pub fn assemble(matches: Vec<JobMatch>, trace: &MatchTrace) -> MatchResponse {
    MatchResponse {
        matches,
        metadata: MatchMetadata {
            request_id: trace.request_id.to_string(),
            resume_metadata_extracted: trace.resume_metadata.clone(),
            metadata_source: trace.metadata_source,
            filters_applied: trace.filters_applied.clone(),
            similarity_threshold: trace.similarity_threshold,
            top_k: trace.top_k,
            candidate_pool: trace.candidate_pool,
            query_results_count: trace.query_results_count,
            retrieval_method: trace.retrieval_method.clone(),
            reranking_method: trace.reranking_method.clone(),
            degradations: trace.degradations.clone(),
            stage_timings_ms: trace.stage_timings_ms.clone(),
            processing_time_ms: trace.elapsed_ms(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::derive_filters;
    use crate::models::{MetadataSource, ResumeMetadata};

    #[test]
    fn test_empty_matches_still_carry_metadata() {
        let mut trace = MatchTrace::new(0.5, 10, 30);
        trace.resume_metadata = ResumeMetadata {
            preferred_location: Some("Remote".to_string()),
            ..Default::default()
        };
        trace.filters_applied = derive_filters(&trace.resume_metadata).conditions;
        trace.retrieval_method = "memory:cosine+filter".to_string();

        let response = assemble(Vec::new(), &trace);
        let json = serde_json::to_value(&response).unwrap();

        assert!(json["matches"].as_array().unwrap().is_empty());
        assert_eq!(json["metadata"]["query_results_count"], 0);
        assert_eq!(json["metadata"]["retrieval_method"], "memory:cosine+filter");
        assert_eq!(json["metadata"]["reranking_method"], "none");
        assert_eq!(json["metadata"]["filters_applied"][0]["field"], "work_location_type");
        assert_eq!(response.metadata.metadata_source, MetadataSource::Extracted);
        assert_eq!(response.metadata.request_id, trace.request_id.to_string());
    }
}
