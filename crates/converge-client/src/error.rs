use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::transport::{HttpResponse, Method};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{method} {url} returned HTTP {status}: {message}")]
    Http {
        status: u16,
        method: Method,
        url: String,
        message: String,
    },

    #[error("operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("timed out after {waited:?} waiting for operation {name}")]
    OperationTimeout { name: String, waited: Duration },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("URL template {template} is missing parameter {param}")]
    UrlParam { template: String, param: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl ClientError {
    /// Build an `Http` error from a non-2xx response, lifting the message
    /// out of the standard `{"error": {"message": ...}}` envelope when present.
    pub fn from_response(method: Method, url: &str, response: &HttpResponse) -> Self {
        let message = match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => String::from_utf8_lossy(&response.body).trim().to_string(),
        };
        ClientError::Http {
            status: response.status,
            method,
            url: url.to_string(),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.status() == Some(412)
    }
}
