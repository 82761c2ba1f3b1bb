//! Resume Match - resume-to-job matching service
//!
//! This library provides the matching pipeline: document extraction,
//! preference extraction and embedding in parallel, filtered vector
//! retrieval, reranking and response assembly.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchOptions, MatchPipeline, PipelineSources};
pub use error::MatchError;
pub use models::{JobMatch, MatchRequest, MatchResponse, ResumeMetadata};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let options = MatchOptions::default();
        assert!(options.top_k.is_none());
        assert!(ResumeMetadata::empty().is_empty());
    }
}
