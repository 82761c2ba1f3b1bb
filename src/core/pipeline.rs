//! Matching pipeline orchestration.
//!
//! # Pipeline Stages
//! 1. Document extraction
//! 2. Preference extraction ∥ embedding generation (joined)
//! 3. Filter derivation and retrieval
//! 4. Reranking with threshold and top-k
//! 5. Response assembly
//!
//! Data flows strictly downstream. Dropping a `run_*` future abandons every
//! in-flight external call.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::config::{MatchingSettings, Settings};
use crate::core::assembler::assemble;
use crate::core::document::{DocumentExtractor, ExtractedDocument};
use crate::core::embedding::{EmbeddingGenerator, EmbeddingSource};
use crate::core::filters::derive_filters_with;
use crate::core::preferences::{PreferenceExtractor, PreferenceSource};
use crate::core::reranker::{RelevanceSignal, RerankInput, Reranker};
use crate::core::retrieval::{RetrievalEngine, VectorIndex};
use crate::core::trace::{MatchTrace, StageOutcome};
use crate::error::{InputErrorKind, MatchError};
use crate::models::{
    EmbedResumeResponse, Embedding, MatchResponse, MetadataSource, ResumeFormat, ResumeMetadata,
};
use crate::services::{EmbeddingCache, RetryPolicy};

/// Filename assumed for pasted resume text
const DEFAULT_TEXT_FILENAME: &str = "resume.txt";

/// Caller overrides for one match request
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub top_k: Option<usize>,
    pub similarity_threshold: Option<f64>,
}

/// External dependencies the pipeline is wired to
#[derive(Clone)]
pub struct PipelineSources {
    pub preferences: Arc<dyn PreferenceSource>,
    pub embeddings: Arc<dyn EmbeddingSource>,
    pub index: Arc<dyn VectorIndex>,
    pub signal: Option<Arc<dyn RelevanceSignal>>,
}

/// Limits resolved from defaults and caller overrides
#[derive(Debug, Clone, Copy, PartialEq)]
struct Resolved {
    top_k: usize,
    similarity_threshold: f64,
    candidate_pool: usize,
}

#[derive(Clone)]
pub struct MatchPipeline {
    documents: DocumentExtractor,
    preferences: PreferenceExtractor,
    embeddings: EmbeddingGenerator,
    retrieval: RetrievalEngine,
    reranker: Reranker,
    matching: MatchingSettings,
}

impl MatchPipeline {
    pub fn new(
        documents: DocumentExtractor,
        preferences: PreferenceExtractor,
        embeddings: EmbeddingGenerator,
        retrieval: RetrievalEngine,
        reranker: Reranker,
        matching: MatchingSettings,
    ) -> Self {
        Self {
            documents,
            preferences,
            embeddings,
            retrieval,
            reranker,
            matching,
        }
    }

    /// Wire every stage from `settings`, one timeout per external call
    pub fn from_settings(settings: &Settings, sources: PipelineSources) -> Self {
        let backoff = Duration::from_millis(settings.retry.backoff_ms);
        let timeouts = &settings.timeouts;
        let cache = EmbeddingCache::new(settings.embedding.cache_size, settings.embedding.cache_ttl_secs);

        Self::new(
            DocumentExtractor::new(settings.document.clone()),
            PreferenceExtractor::new(
                sources.preferences,
                RetryPolicy::new(timeouts.extraction(), backoff),
                settings.extraction.max_input_chars,
            ),
            EmbeddingGenerator::new(
                sources.embeddings,
                RetryPolicy::new(timeouts.embedding(), backoff),
                settings.embedding.dimension,
                settings.embedding.max_tokens,
                cache,
            ),
            RetrievalEngine::new(sources.index, RetryPolicy::new(timeouts.retrieval(), backoff)),
            Reranker::new(sources.signal, RetryPolicy::new(timeouts.rerank(), backoff)),
            settings.matching.clone(),
        )
    }

    pub fn index_name(&self) -> &str {
        self.retrieval.index_name()
    }

    /// Match an uploaded resume file
    pub async fn run_document(
        &self,
        filename: &str,
        bytes: &[u8],
        options: MatchOptions,
    ) -> Result<MatchResponse, MatchError> {
        let format = format_of(filename)?;
        let resolved = self.resolve(options)?;
        let mut trace = MatchTrace::new(resolved.similarity_threshold, resolved.top_k, resolved.candidate_pool);

        let started = Instant::now();
        let document = self.documents.extract(filename, format, bytes).await?;
        trace.record_stage("document_extraction", started);

        self.match_document(document, None, trace).await
    }

    /// Match resume text extracted upstream, optionally with known preferences
    pub async fn run_text(
        &self,
        resume_text: &str,
        filename: Option<&str>,
        format: Option<ResumeFormat>,
        supplied_metadata: Option<ResumeMetadata>,
        options: MatchOptions,
    ) -> Result<MatchResponse, MatchError> {
        let filename = filename.unwrap_or(DEFAULT_TEXT_FILENAME);
        let format = format
            .or_else(|| ResumeFormat::from_filename(filename))
            .unwrap_or(ResumeFormat::Txt);
        let resolved = self.resolve(options)?;
        let mut trace = MatchTrace::new(resolved.similarity_threshold, resolved.top_k, resolved.candidate_pool);

        let started = Instant::now();
        let document = self.documents.from_text(filename, format, resume_text)?;
        trace.record_stage("document_extraction", started);

        self.match_document(document, supplied_metadata, trace).await
    }

    /// Extract, embed and analyse a resume without matching it
    pub async fn embed_document(&self, filename: &str, bytes: &[u8]) -> Result<EmbedResumeResponse, MatchError> {
        let started = Instant::now();
        let format = format_of(filename)?;
        let document = self.documents.extract(filename, format, bytes).await?;

        let ((outcome, _), (embedding, _)) = tokio::join!(
            timed(self.preferences.extract(&document.resume.content)),
            timed(self.embeddings.generate(&document.resume.content)),
        );
        let embedding = embedding?;

        let metadata_source = if outcome.is_degraded() {
            MetadataSource::Degraded
        } else {
            MetadataSource::Extracted
        };
        let processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            "Embedded {} ({} bytes, {} chars) in {}ms",
            filename, document.byte_count, document.char_count, processing_time_ms
        );

        Ok(EmbedResumeResponse {
            status: "success".to_string(),
            filename: filename.to_string(),
            file_size_bytes: document.byte_count,
            text_length: document.char_count,
            page_count: document.page_count,
            truncated: document.truncated,
            embedding_dimension: embedding.dimension(),
            processing_time_ms,
            resume_text: document.resume.content,
            resume_metadata: outcome.into_value(),
            metadata_source,
            message: format!("Resume {} processed successfully", filename),
        })
    }

    async fn match_document(
        &self,
        document: ExtractedDocument,
        supplied_metadata: Option<ResumeMetadata>,
        mut trace: MatchTrace,
    ) -> Result<MatchResponse, MatchError> {
        let text = document.resume.content.as_str();

        // Preference extraction ∥ embedding; the join waits for both
        let preferences = async {
            match supplied_metadata {
                Some(metadata) => (StageOutcome::Complete(metadata), MetadataSource::Caller),
                None => {
                    let outcome = self.preferences.extract(text).await;
                    let source = if outcome.is_degraded() {
                        MetadataSource::Degraded
                    } else {
                        MetadataSource::Extracted
                    };
                    (outcome, source)
                }
            }
        };
        let ((preferences, preference_time), (embedding, embedding_time)) =
            tokio::join!(timed(preferences), timed(self.embeddings.generate(text)));

        let (outcome, source) = preferences;
        if source != MetadataSource::Caller {
            trace.record_duration("preference_extraction", preference_time);
        }
        trace.record_duration("embedding", embedding_time);
        if let StageOutcome::Degraded { reason, .. } = &outcome {
            trace.record_degradation("preference_extraction", reason);
        }
        trace.metadata_source = source;
        trace.resume_metadata = outcome.into_value();

        let embedding: Embedding = embedding.map_err(|e| {
            error!("Request {} failed at embedding: {}", trace.request_id, e);
            e
        })?;

        let filter = derive_filters_with(&trace.resume_metadata, self.matching.sponsorship);
        trace.filters_applied = filter.conditions.clone();

        let started = Instant::now();
        let retrieval = self
            .retrieval
            .retrieve(&embedding, &filter, trace.candidate_pool)
            .await
            .map_err(|e| {
                error!("Request {} failed at retrieval: {}", trace.request_id, e);
                e
            })?;
        trace.record_stage("retrieval", started);
        trace.query_results_count = retrieval.candidates.len();
        trace.retrieval_method = retrieval.method;

        let started = Instant::now();
        let input = RerankInput {
            resume_text: text,
            preferences: &trace.resume_metadata,
        };
        let outcome = self
            .reranker
            .rerank(&input, retrieval.candidates, trace.similarity_threshold, trace.top_k)
            .await;
        trace.record_stage("reranking", started);
        if let StageOutcome::Degraded { reason, .. } = &outcome {
            trace.record_degradation("reranking", reason);
        }
        let reranked = outcome.into_value();
        trace.reranking_method = reranked.method;

        info!(
            "Request {}: {} matches from {} candidates ({} filters, rerank {}, {} degradations) in {}ms",
            trace.request_id,
            reranked.matches.len(),
            trace.query_results_count,
            trace.filters_applied.len(),
            trace.reranking_method,
            trace.degradations.len(),
            trace.elapsed_ms()
        );

        Ok(assemble(reranked.matches, &trace))
    }

    fn resolve(&self, options: MatchOptions) -> Result<Resolved, MatchError> {
        let top_k = options.top_k.unwrap_or(self.matching.top_k);
        if top_k == 0 || top_k > self.matching.max_top_k {
            return Err(MatchError::invalid_request(format!(
                "top_k must be between 1 and {}",
                self.matching.max_top_k
            )));
        }

        let similarity_threshold = options
            .similarity_threshold
            .unwrap_or(self.matching.similarity_threshold);
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(MatchError::invalid_request(
                "similarity_threshold must be between 0 and 1",
            ));
        }

        Ok(Resolved {
            top_k,
            similarity_threshold,
            candidate_pool: self.matching.candidate_pool.max(top_k),
        })
    }
}

fn format_of(filename: &str) -> Result<ResumeFormat, MatchError> {
    ResumeFormat::from_filename(filename).ok_or_else(|| {
        MatchError::input(
            InputErrorKind::UnsupportedFormat,
            "Unsupported file type. Please upload a PDF or TXT file.",
        )
    })
}

async fn timed<F: Future>(future: F) -> (F::Output, Duration) {
    let started = Instant::now();
    let output = future.await;
    (output, started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoostWeights;
    use crate::core::reranker::PreferenceSignal;
    use crate::services::{InMemoryIndex, JobRecord, ServiceError};
    use async_trait::async_trait;

    struct NoPreferences;

    #[async_trait]
    impl PreferenceSource for NoPreferences {
        async fn extract(&self, _resume_text: &str) -> Result<ResumeMetadata, ServiceError> {
            Ok(ResumeMetadata::empty())
        }
    }

    struct UnitEmbedding;

    #[async_trait]
    impl EmbeddingSource for UnitEmbedding {
        fn model(&self) -> &str {
            "unit"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn pipeline() -> MatchPipeline {
        let mut settings = Settings::default();
        settings.embedding.dimension = 2;
        settings.embedding.cache_size = 0;
        settings.matching.max_top_k = 20;

        let index = InMemoryIndex::from_records(
            vec![JobRecord {
                job_id: "job-1".to_string(),
                embedding: vec![1.0, 0.0],
                metadata: Default::default(),
            }],
            2,
        )
        .unwrap();

        MatchPipeline::from_settings(
            &settings,
            PipelineSources {
                preferences: Arc::new(NoPreferences),
                embeddings: Arc::new(UnitEmbedding),
                index: Arc::new(index),
                signal: Some(Arc::new(PreferenceSignal::new(BoostWeights::default()))),
            },
        )
    }

    #[test]
    fn test_resolve_defaults_and_pool() {
        let pipeline = pipeline();
        let resolved = pipeline.resolve(MatchOptions::default()).unwrap();
        assert_eq!(resolved.top_k, 10);
        assert_eq!(resolved.similarity_threshold, 0.5);
        assert_eq!(resolved.candidate_pool, 30);

        let resolved = pipeline
            .resolve(MatchOptions {
                top_k: Some(20),
                similarity_threshold: Some(0.0),
            })
            .unwrap();
        assert_eq!(resolved.candidate_pool, 30);
    }

    #[test]
    fn test_resolve_rejects_out_of_bounds() {
        let pipeline = pipeline();
        for options in [
            MatchOptions {
                top_k: Some(0),
                similarity_threshold: None,
            },
            MatchOptions {
                top_k: Some(21),
                similarity_threshold: None,
            },
            MatchOptions {
                top_k: None,
                similarity_threshold: Some(1.5),
            },
            MatchOptions {
                top_k: None,
                similarity_threshold: Some(f64::NAN),
            },
        ] {
            let err = pipeline.resolve(options).unwrap_err();
            assert_eq!(err.kind(), "InvalidRequest");
        }
    }

    #[tokio::test]
    async fn test_unsupported_upload_rejected() {
        let err = pipeline()
            .run_document("resume.docx", b"bytes", MatchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedFormat");
    }

    #[tokio::test]
    async fn test_text_run_records_stages() {
        let response = pipeline()
            .run_text("Senior Go engineer", None, None, None, MatchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.metadata.reranking_method, "preference_boost");
        assert_eq!(response.metadata.retrieval_method, "memory:cosine");
        for stage in ["document_extraction", "preference_extraction", "embedding", "retrieval", "reranking"] {
            assert!(response.metadata.stage_timings_ms.contains_key(stage), "missing {}", stage);
        }
    }

    #[tokio::test]
    async fn test_embed_document() {
        let response = pipeline()
            .embed_document("cv.txt", "Senior Go engineer".as_bytes())
            .await
            .unwrap();

        assert_eq!(response.embedding_dimension, 2);
        assert_eq!(response.file_size_bytes, 18);
        assert_eq!(response.metadata_source, MetadataSource::Extracted);
        assert_eq!(response.page_count, None);
    }
}
