use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::ClientError;
use crate::transport::{HttpResponse, Method};

/// A long-running compute operation as returned by mutating calls.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub target_link: String,
    #[serde(default)]
    pub self_link: String,
    #[serde(default)]
    pub error: Option<OperationErrors>,
    #[serde(default)]
    pub http_error_status_code: Option<u16>,
    #[serde(skip)]
    response: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ComputeOperation {
    /// Whether a response body is an operation rather than a resource.
    pub fn looks_like_operation(body: &Value) -> bool {
        match body.get("kind").and_then(Value::as_str) {
            Some(kind) => kind.ends_with("#operation"),
            None => {
                body.get("status").is_some()
                    && body.get("selfLink").is_some()
                    && body.get("targetLink").is_some()
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }

    /// Resource state fetched from `targetLink` once the operation is done.
    pub fn first_response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    fn check_error(&self) -> Result<(), ClientError> {
        let Some(errors) = &self.error else {
            return Ok(());
        };
        if errors.errors.is_empty() {
            return Ok(());
        }
        let message = errors
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ClientError::OperationFailed {
            name: self.name.clone(),
            message,
        })
    }

    /// Poll `selfLink` with GET until the operation is `DONE`.
    ///
    /// Bounded by `operation_wait.timeout_secs` (falling back to the client
    /// timeout). Dropping the future abandons the wait.
    pub async fn wait(&mut self, client: &Client) -> Result<(), ClientError> {
        let timeout = client.config().operation_timeout();
        let interval = Duration::from_millis(client.config().operation_wait.poll_interval_ms);
        let started = Instant::now();

        loop {
            self.check_error()?;
            if self.is_done() {
                break;
            }
            if self.self_link.is_empty() {
                return Err(ClientError::OperationFailed {
                    name: self.name.clone(),
                    message: format!("operation is {} and has no selfLink to poll", self.status),
                });
            }
            let waited = started.elapsed();
            if waited >= timeout {
                tracing::warn!(operation = %self.name, ?waited, "operation wait timed out");
                return Err(ClientError::OperationTimeout {
                    name: self.name.clone(),
                    waited,
                });
            }
            tokio::time::sleep(interval).await;
            let polled: ComputeOperation =
                client.send(Method::Get, &self.self_link, None).await?.json()?;
            tracing::debug!(operation = %polled.name, status = %polled.status, "polled operation");
            *self = polled;
        }

        if !self.target_link.is_empty() && self.operation_type != "delete" {
            match client.get_json(&self.target_link).await {
                Ok(body) => self.response = Some(body),
                Err(e) => tracing::debug!(
                    error = %e,
                    target = %self.target_link,
                    "could not fetch operation target"
                ),
            }
        }
        Ok(())
    }
}

/// Wait out whatever a mutating call returned.
///
/// Operation bodies are polled to completion and yield the target
/// resource; any other body is already the resource.
pub async fn wait_for_response(
    client: &Client,
    response: &HttpResponse,
) -> Result<Option<Value>, ClientError> {
    let body: Value = response.json()?;
    if body.is_null() {
        return Ok(None);
    }
    if !ComputeOperation::looks_like_operation(&body) {
        return Ok(Some(body));
    }
    let mut op: ComputeOperation = serde_json::from_value(body)?;
    op.wait(client).await.inspect_err(|e| {
        tracing::warn!(operation = %op.name, error = %e, "operation did not complete");
    })?;
    Ok(op.first_response().cloned())
}
