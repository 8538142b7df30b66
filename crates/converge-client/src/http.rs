use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::config::Config;
use crate::error::ClientError;
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, Method, Transport};

/// [`Transport`] over HTTPS with an optional OAuth bearer token.
pub struct ReqwestTransport {
    http: reqwest::Client,
    user_agent: String,
    bearer_token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        Box::pin(async move {
            let mut req = self
                .http
                .request(to_reqwest(request.method), &request.url)
                .header(USER_AGENT, &self.user_agent);
            if let Some(token) = &self.bearer_token {
                req = req.bearer_auth(token);
            }
            if let Some(id) = &request.request_id {
                req = req.header("x-request-id", id);
            }
            if let Some(body) = request.body {
                req = req.header(CONTENT_TYPE, "application/json").body(body);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            let status = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?
                .to_vec();
            Ok(HttpResponse { status, body })
        })
    }
}
