// Service exports
pub mod cache;
pub mod cross_encoder;
pub mod memory_index;
pub mod openai;
pub mod pinecone;
pub mod retry;

use std::time::Duration;
use thiserror::Error;

pub use cache::{CacheKey, EmbeddingCache};
pub use cross_encoder::CrossEncoderClient;
pub use memory_index::{InMemoryIndex, IndexLoadError, JobRecord};
pub use openai::OpenAiClient;
pub use pinecone::PineconeClient;
pub use retry::{with_retry, RetryPolicy};

/// Errors that can occur when calling an external dependency
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Build the shared HTTP client used by every external service client
pub(crate) fn http_client() -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(ServiceError::RequestError)
}

/// Turn a non-success response into an `ApiError`, keeping the body for diagnostics
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read body".to_string());
    Err(ServiceError::ApiError {
        status: status.as_u16(),
        message: body,
    })
}
