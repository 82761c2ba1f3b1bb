use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::ServiceError;

/// Timeout and retry budget for one external call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Budget for each individual attempt
    pub timeout: Duration,
    /// Delay before the single retry
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self { timeout, backoff }
    }
}

/// Run `call` under `policy.timeout`, retrying exactly once after `policy.backoff`.
///
/// Dropping the returned future abandons the in-flight attempt.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: RetryPolicy, mut call: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match attempt(policy.timeout, call()).await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(
                "{} failed ({}), retrying after {}ms",
                operation,
                first,
                policy.backoff.as_millis()
            );
            tokio::time::sleep(policy.backoff).await;
            attempt(policy.timeout, call()).await
        }
    }
}

async fn attempt<T, Fut>(timeout: Duration, fut: Fut) -> Result<T, ServiceError>
where
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(timeout)),
    }
}
