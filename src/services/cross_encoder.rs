use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, http_client, ServiceError};
use crate::config::RerankingSettings;

/// Client for a hosted cross-encoder rerank endpoint
#[derive(Clone)]
pub struct CrossEncoderClient {
    url: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f64,
}

impl CrossEncoderClient {
    pub fn new(settings: &RerankingSettings) -> Result<Self, ServiceError> {
        if settings.url.trim().is_empty() {
            return Err(ServiceError::Unavailable(
                "Cross-encoder URL is not configured".to_string(),
            ));
        }

        Ok(Self {
            url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            client: http_client()?,
        })
    }

    /// Relevance of each document to `query`, in document order
    pub async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f64>, ServiceError> {
        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
        };

        let mut builder = self.client.post(format!("{}/rerank", self.url)).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder.send().await?;

        let body: RerankResponse = check_status(response).await?.json().await?;
        debug!("Cross-encoder scored {} of {} documents", body.results.len(), documents.len());

        let mut scores: Vec<Option<f64>> = vec![None; documents.len()];
        for result in body.results {
            let slot = scores.get_mut(result.index).ok_or_else(|| {
                ServiceError::InvalidResponse(format!("Rerank index {} out of range", result.index))
            })?;
            *slot = Some(result.relevance_score);
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| {
                score.ok_or_else(|| ServiceError::InvalidResponse(format!("Rerank result missing for document {}", i)))
            })
            .collect()
    }
}
