// Core pipeline exports
pub mod assembler;
pub mod document;
pub mod embedding;
pub mod filters;
pub mod pipeline;
pub mod preferences;
pub mod reranker;
pub mod retrieval;
pub mod scoring;
pub mod similarity;
pub mod trace;

pub use assembler::assemble;
pub use document::{DocumentExtractor, ExtractedDocument};
pub use embedding::{EmbeddingGenerator, EmbeddingSource};
pub use filters::{derive_filters, derive_filters_with, FilterCondition, MetadataFilter};
pub use pipeline::{MatchOptions, MatchPipeline, PipelineSources};
pub use preferences::{PreferenceExtractor, PreferenceSource};
pub use reranker::{CrossEncoderSignal, PreferenceSignal, RelevanceSignal, Reranker};
pub use retrieval::{IndexQuery, RetrievalEngine, VectorIndex};
pub use similarity::cosine_similarity;
pub use trace::{MatchTrace, StageOutcome};
