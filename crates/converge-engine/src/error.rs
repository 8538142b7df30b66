use std::time::Duration;

use converge_client::ClientError;
use converge_core::{CoreError, FieldDiff};
use serde_json::Value;
use thiserror::Error;

use crate::addr::ResourceAddr;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {resource_type}: {message}")]
    Validation {
        resource_type: String,
        message: String,
    },

    #[error("resource not found: {addr}")]
    NotFound { addr: ResourceAddr },

    #[error("apply infeasible: {0}")]
    ApplyInfeasible(String),

    #[error("{operation} on {addr} failed: {source}")]
    Operation {
        operation: String,
        addr: ResourceAddr,
        #[source]
        source: ClientError,
    },

    #[error("diffs remain after apply: {}", format_diffs(.diffs))]
    DiffAfterApply {
        diffs: Vec<FieldDiff>,
        state: Box<Value>,
    },

    #[error("{addr} still present after delete")]
    NotDeleted { addr: ResourceAddr },

    #[error("failed to delete {} resource(s): {}", .failures.len(), .failures.join("\n"))]
    DeleteAll { failures: Vec<String> },

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("schema error: {0}")]
    Schema(#[from] CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(e) | Self::Operation { source: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || self.client_error().is_some_and(ClientError::is_not_found)
    }

    /// 409: the whole apply may be retried from the top.
    pub fn is_conflict(&self) -> bool {
        self.client_error().is_some_and(ClientError::is_conflict)
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.client_error().is_some_and(ClientError::is_precondition_failed)
    }
}

fn format_diffs(diffs: &[FieldDiff]) -> String {
    diffs
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
