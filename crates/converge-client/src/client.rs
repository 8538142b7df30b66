use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::{Config, ConfigOverride};
use crate::error::ClientError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Configured handle to a REST endpoint.
///
/// Cheap to clone. Reconfiguring (`clone_with`, `with_request_id`) yields a
/// new client sharing the same transport; the original is untouched.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    request_id: Option<Arc<str>>,
}

impl Client {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            request_id: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn clone_with(&self, overrides: &[ConfigOverride]) -> Client {
        Client {
            config: Arc::new(self.config.clone_with(overrides)),
            transport: Arc::clone(&self.transport),
            request_id: self.request_id.clone(),
        }
    }

    pub fn with_request_id(&self, request_id: impl Into<String>) -> Client {
        Client {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            request_id: Some(Arc::from(request_id.into())),
        }
    }

    /// `base_path` from config if set, otherwise the caller's default.
    pub fn base_path_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.config.base_path.is_empty() {
            default
        } else {
            &self.config.base_path
        }
    }

    /// Send one logical request, retrying per `code_retryability`.
    ///
    /// Non-2xx responses that are not retried come back as
    /// [`ClientError::Http`].
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ClientError> {
        let body = body.map(serde_json::to_vec).transpose()?;
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request = HttpRequest {
                method,
                url: url.to_string(),
                body: body.clone(),
                request_id: self.request_id.as_deref().map(str::to_string),
            };
            tracing::debug!(method = %method, url, attempt, "sending request");

            let err = match self.transport.send(request).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => ClientError::from_response(method, url, &resp),
                Err(e) => e,
            };

            if !self.should_retry(&err, attempt, started.elapsed()) {
                return Err(err);
            }
            let delay = self.config.retry.backoff(attempt);
            tracing::warn!(
                error = %err,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        self.send(Method::Get, url, None).await?.json()
    }

    fn should_retry(&self, err: &ClientError, attempt: u32, elapsed: Duration) -> bool {
        if attempt >= self.config.retry.max_attempts {
            return false;
        }
        match err {
            ClientError::Http {
                status, message, ..
            } => match self.config.retryability(*status) {
                Some(r) if r.retryable && r.matches(message) => {
                    r.timeout_secs == 0 || elapsed < Duration::from_secs(r.timeout_secs)
                }
                _ => false,
            },
            ClientError::Transport(_) => true,
            _ => false,
        }
    }
}
