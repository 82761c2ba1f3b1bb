//! Reranker: second-pass scoring of retrieved candidates.
//!
//! # Pipeline Stages
//! 1. Rescore with the configured relevance signal (raw similarity if none
//!    or if the signal fails)
//! 2. Clamp to [0, 1]
//! 3. Drop candidates below the similarity threshold
//! 4. Stable sort, descending; ties keep retrieval order
//! 5. Truncate to k and assign ranks 1..=len

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::BoostWeights;
use crate::core::scoring::{blend, preference_adjustment};
use crate::core::similarity::clamp_unit;
use crate::core::trace::StageOutcome;
use crate::models::{JobCandidate, JobMatch, ResumeMetadata};
use crate::services::{with_retry, CrossEncoderClient, RetryPolicy, ServiceError};

pub const PASS_THROUGH: &str = "none";

/// What the relevance signal may look at besides the candidates
#[derive(Debug, Clone, Copy)]
pub struct RerankInput<'a> {
    pub resume_text: &'a str,
    pub preferences: &'a ResumeMetadata,
}

/// New score for one candidate, with the reasons behind it
#[derive(Debug, Clone, PartialEq)]
pub struct Rescored {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// A secondary relevance signal
///
/// Implementations return exactly one `Rescored` per candidate, in order.
#[async_trait]
pub trait RelevanceSignal: Send + Sync {
    /// Reported as `reranking_method`
    fn method(&self) -> &'static str;

    async fn rescore(
        &self,
        input: &RerankInput<'_>,
        candidates: &[JobCandidate],
    ) -> Result<Vec<Rescored>, ServiceError>;
}

/// Raw similarity adjusted by preference alignment
#[derive(Debug, Clone)]
pub struct PreferenceSignal {
    weights: BoostWeights,
}

impl PreferenceSignal {
    pub fn new(weights: BoostWeights) -> Self {
        Self { weights }
    }
}

#[async_trait]
impl RelevanceSignal for PreferenceSignal {
    fn method(&self) -> &'static str {
        "preference_boost"
    }

    async fn rescore(
        &self,
        input: &RerankInput<'_>,
        candidates: &[JobCandidate],
    ) -> Result<Vec<Rescored>, ServiceError> {
        Ok(candidates
            .iter()
            .map(|candidate| {
                let (adjustment, reasons) =
                    preference_adjustment(input.preferences, &candidate.metadata, &self.weights);
                Rescored {
                    score: candidate.raw_similarity + adjustment,
                    reasons,
                }
            })
            .collect())
    }
}

/// Raw similarity blended with a cross-encoder relevance score
#[derive(Clone)]
pub struct CrossEncoderSignal {
    client: CrossEncoderClient,
    blend_weight: f64,
}

impl CrossEncoderSignal {
    pub fn new(client: CrossEncoderClient, blend_weight: f64) -> Self {
        Self { client, blend_weight }
    }
}

#[async_trait]
impl RelevanceSignal for CrossEncoderSignal {
    fn method(&self) -> &'static str {
        "cross_encoder"
    }

    async fn rescore(
        &self,
        input: &RerankInput<'_>,
        candidates: &[JobCandidate],
    ) -> Result<Vec<Rescored>, ServiceError> {
        let documents: Vec<String> = candidates.iter().map(job_document).collect();
        let relevance = self.client.score(input.resume_text, &documents).await?;

        Ok(candidates
            .iter()
            .zip(relevance)
            .map(|(candidate, relevance)| Rescored {
                score: blend(candidate.raw_similarity, relevance, self.blend_weight),
                reasons: vec![format!("cross-encoder relevance {:.3}", relevance)],
            })
            .collect())
    }
}

/// Text the cross-encoder compares against the resume
pub fn job_document(candidate: &JobCandidate) -> String {
    let job = &candidate.metadata;
    let mut document = candidate.title.clone();
    if !job.company_name.is_empty() {
        document.push_str(&format!(" at {}", job.company_name));
    }
    let details: Vec<&str> = [
        job.job_category.as_str(),
        job.employment_type.as_str(),
        job.location.as_str(),
        job.work_location_type.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();
    if !details.is_empty() {
        document.push_str(". ");
        document.push_str(&details.join(", "));
    }
    document
}

/// Ranked output of the reranker
#[derive(Debug, Clone)]
pub struct Reranked {
    pub matches: Vec<JobMatch>,
    pub method: String,
}

#[derive(Clone)]
pub struct Reranker {
    signal: Option<Arc<dyn RelevanceSignal>>,
    policy: RetryPolicy,
}

impl Reranker {
    pub fn new(signal: Option<Arc<dyn RelevanceSignal>>, policy: RetryPolicy) -> Self {
        Self { signal, policy }
    }

    pub fn method(&self) -> &'static str {
        self.signal.as_ref().map(|s| s.method()).unwrap_or(PASS_THROUGH)
    }

    /// Rescore, threshold and cut `candidates` to at most `top_k` matches.
    ///
    /// `candidates` must be in retrieval order.
    pub async fn rerank(
        &self,
        input: &RerankInput<'_>,
        candidates: Vec<JobCandidate>,
        similarity_threshold: f64,
        top_k: usize,
    ) -> StageOutcome<Reranked> {
        let (scores, method, degraded) = match (&self.signal, candidates.is_empty()) {
            (Some(signal), false) => match self.rescore(signal.as_ref(), input, &candidates).await {
                Ok(scores) => (scores, signal.method(), None),
                Err(e) => {
                    warn!(
                        "Relevance signal {} unavailable, passing raw similarity through: {}",
                        signal.method(),
                        e
                    );
                    (pass_through(&candidates), PASS_THROUGH, Some(e.to_string()))
                }
            },
            _ => (pass_through(&candidates), self.method(), None),
        };

        let matches = rank(candidates, scores, similarity_threshold, top_k);
        debug!("Reranked with {}: {} matches above {}", method, matches.len(), similarity_threshold);

        let reranked = Reranked {
            matches,
            method: method.to_string(),
        };
        match degraded {
            None => StageOutcome::Complete(reranked),
            Some(reason) => StageOutcome::Degraded {
                value: reranked,
                reason,
            },
        }
    }

    async fn rescore(
        &self,
        signal: &dyn RelevanceSignal,
        input: &RerankInput<'_>,
        candidates: &[JobCandidate],
    ) -> Result<Vec<Rescored>, ServiceError> {
        let scores = with_retry("rerank", self.policy, || signal.rescore(input, candidates)).await?;
        if scores.len() != candidates.len() {
            return Err(ServiceError::InvalidResponse(format!(
                "Relevance signal scored {} of {} candidates",
                scores.len(),
                candidates.len()
            )));
        }
        Ok(scores)
    }
}

fn pass_through(candidates: &[JobCandidate]) -> Vec<Rescored> {
    candidates
        .iter()
        .map(|c| Rescored {
            score: c.raw_similarity,
            reasons: Vec::new(),
        })
        .collect()
}

/// Clamp, threshold, stable sort, truncate and assign ranks
pub fn rank(
    candidates: Vec<JobCandidate>,
    scores: Vec<Rescored>,
    similarity_threshold: f64,
    top_k: usize,
) -> Vec<JobMatch> {
    let mut scored: Vec<(JobCandidate, Rescored)> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, mut rescored)| {
            rescored.score = clamp_unit(rescored.score);
            (candidate, rescored)
        })
        .filter(|(_, rescored)| rescored.score >= similarity_threshold)
        .collect();

    scored.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (candidate, rescored))| into_match(candidate, rescored, i + 1))
        .collect()
}

fn into_match(candidate: JobCandidate, rescored: Rescored, rank: usize) -> JobMatch {
    let job = candidate.metadata;
    JobMatch {
        job_id: candidate.job_id,
        title: candidate.title,
        score: rescored.score,
        rank,
        raw_similarity: candidate.raw_similarity,
        company_name: job.company_name,
        location: job.location,
        job_category: job.job_category,
        employment_type: job.employment_type,
        work_location_type: job.work_location_type,
        h1b_sponsorship: job.h1b_sponsorship,
        reasons: rescored.reasons,
    }
}
