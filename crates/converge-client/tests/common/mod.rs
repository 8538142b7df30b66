use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use converge_client::{
    BoxFuture, ClientError, Config, HttpRequest, HttpResponse, OperationWait, RetryPolicy,
    Transport,
};
use serde_json::Value;

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ClientError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: Value) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ClientError::Transport(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| Err(ClientError::Transport("script exhausted".to_string())))
        })
    }
}

/// Default config with millisecond backoffs and polling.
pub fn fast_config() -> Config {
    Config {
        retry: RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        },
        operation_wait: OperationWait {
            poll_interval_ms: 1,
            timeout_secs: 0,
        },
        ..Config::default()
    }
}
