//! converge-client
//!
//! HTTP boundary for the reconciliation engine: immutable configuration with
//! per-call overrides, status-code driven request retry, long-running
//! operation polling, and URL templating.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod template;
pub mod transport;

pub use crate::client::Client;
pub use crate::config::{Config, ConfigOverride, OperationWait, RetryPolicy, Retryability};
pub use crate::error::ClientError;
pub use crate::http::ReqwestTransport;
pub use crate::operation::{ComputeOperation, wait_for_response};
pub use crate::transport::{BoxFuture, HttpRequest, HttpResponse, Method, Transport};
