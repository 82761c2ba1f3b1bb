use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{check_status, http_client, ServiceError};
use crate::config::PineconeSettings;
use crate::core::retrieval::{IndexQuery, VectorIndex};
use crate::models::{JobAttributes, JobCandidate};

/// Pinecone data-plane client for a cosine job index
#[derive(Clone)]
pub struct PineconeClient {
    index_host: String,
    api_key: String,
    namespace: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredVector>,
}

#[derive(Debug, Deserialize)]
struct ScoredVector {
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: Option<Value>,
}

impl PineconeClient {
    pub fn new(settings: &PineconeSettings) -> Result<Self, ServiceError> {
        if settings.index_host.trim().is_empty() {
            return Err(ServiceError::Unavailable(
                "Pinecone index host is not configured".to_string(),
            ));
        }

        let host = settings.index_host.trim_end_matches('/');
        let index_host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            index_host,
            api_key: settings.api_key.clone(),
            namespace: settings.namespace.clone().filter(|ns| !ns.is_empty()),
            client: http_client()?,
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<JobCandidate>, ServiceError> {
        let request = QueryRequest {
            vector: query.vector.as_slice(),
            top_k: query.top_n,
            include_metadata: true,
            filter: query.filter.to_pinecone(),
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.index_host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: QueryResponse = check_status(response).await?.json().await?;
        debug!("Pinecone returned {} matches", body.matches.len());

        body.matches.into_iter().map(into_candidate).collect()
    }
}

fn into_candidate(matched: ScoredVector) -> Result<JobCandidate, ServiceError> {
    let metadata: JobAttributes = match matched.metadata {
        Some(value) => serde_json::from_value(value).map_err(|e| {
            ServiceError::InvalidResponse(format!("Bad metadata for job {}: {}", matched.id, e))
        })?,
        None => JobAttributes::default(),
    };
    Ok(JobCandidate::new(matched.id, matched.score, metadata))
}
