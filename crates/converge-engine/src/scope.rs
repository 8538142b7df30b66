use std::future::Future;

use converge_client::config::precondition_failed_not_retryable;
use converge_client::Client;
use uuid::Uuid;

use crate::error::EngineError;

/// Client for one top-level call: 412 is never retried and every request
/// carries a fresh request id. The caller's client is left untouched.
pub(crate) fn call_client(client: &Client) -> Client {
    client
        .clone_with(&[precondition_failed_not_retryable()])
        .with_request_id(Uuid::new_v4().to_string())
}

/// Bound a whole call by the configured timeout. Dropping the inner future
/// cancels any in-flight request or operation wait.
pub(crate) async fn with_deadline<T>(
    client: &Client,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let timeout = client.config().timeout();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?timeout, "deadline exceeded");
            Err(EngineError::DeadlineExceeded(timeout))
        }
    }
}
