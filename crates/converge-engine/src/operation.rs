use std::fmt;

use converge_client::{wait_for_response, Client};
use converge_core::FieldDiff;
use serde_json::Value;

use crate::error::EngineError;
use crate::read::{fetch_optional, fetch_raw};
use crate::resource::{resolve, ResourceKind, UpdateSpec};

#[derive(Debug, Clone, Default)]
pub struct CreateOperation {
    response: Option<Value>,
}

impl CreateOperation {
    /// Resource body the server returned when the create finished.
    pub fn first_response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    async fn execute(
        &mut self,
        client: &Client,
        kind: &dyn ResourceKind,
        resource: &Value,
    ) -> Result<(), EngineError> {
        let endpoint = kind.create_endpoint(resource)?;
        let body = kind.create_body(resource);
        let url = resolve(client, kind, &endpoint.path);
        let resp = client.send(endpoint.method, &url, Some(&body)).await?;
        self.response = match wait_for_response(client, &resp).await? {
            Some(body) if kind.operation_targets_resource() => Some(body),
            _ => Some(fetch_raw(client, kind, resource).await?),
        };
        Ok(())
    }
}

/// A named in-place update and the diffs it reconciles.
#[derive(Debug, Clone)]
pub struct UpdateOperation {
    pub spec: UpdateSpec,
    pub field_diffs: Vec<FieldDiff>,
}

impl UpdateOperation {
    async fn execute(
        &self,
        client: &Client,
        kind: &dyn ResourceKind,
        resource: &Value,
    ) -> Result<(), EngineError> {
        let current = fetch_raw(client, kind, resource).await?;
        let path = (self.spec.path)(resource)?;
        let body = (self.spec.body)(&self.spec, kind.schema(), resource, &current)?;
        let url = resolve(client, kind, &path);
        tracing::debug!(
            operation = self.spec.name,
            fields = ?self.field_diffs.iter().map(|d| d.field_name.as_str()).collect::<Vec<_>>(),
            "sending update"
        );
        let resp = client.send(self.spec.method, &url, Some(&body)).await?;
        wait_for_response(client, &resp).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOperation;

impl DeleteOperation {
    async fn execute(
        &self,
        client: &Client,
        kind: &dyn ResourceKind,
        resource: &Value,
    ) -> Result<(), EngineError> {
        if fetch_optional(client, kind, resource).await?.is_none() {
            tracing::debug!(addr = %kind.addr(resource), "already absent");
            return Ok(());
        }

        let endpoint = kind.delete_endpoint(resource)?;
        let url = resolve(client, kind, &endpoint.path);
        let resp = match client.send(endpoint.method, &url, None).await {
            Ok(resp) => resp,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        wait_for_response(client, &resp).await?;

        // Get can keep returning a deleted resource for a short while.
        let attempts = client.config().delete_confirm_attempts;
        for attempt in 1..=attempts {
            if fetch_optional(client, kind, resource).await?.is_none() {
                return Ok(());
            }
            let delay = client.config().retry.backoff(attempt);
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "resource still visible after delete"
            );
            tokio::time::sleep(delay).await;
        }
        if fetch_optional(client, kind, resource).await?.is_none() {
            return Ok(());
        }
        Err(EngineError::NotDeleted {
            addr: kind.addr(resource),
        })
    }
}

/// One remote mutation in an apply plan.
#[derive(Debug, Clone)]
pub enum ApiOperation {
    Create(CreateOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
}

impl ApiOperation {
    pub fn create() -> Self {
        Self::Create(CreateOperation::default())
    }

    pub fn delete() -> Self {
        Self::Delete(DeleteOperation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(op) => op.spec.name,
            Self::Delete(_) => "delete",
        }
    }

    pub fn field_diffs(&self) -> &[FieldDiff] {
        match self {
            Self::Update(op) => &op.field_diffs,
            _ => &[],
        }
    }

    /// Send the request and wait for any long-running operation to finish.
    /// Client failures come back wrapped with the operation name and address.
    pub async fn execute(
        &mut self,
        client: &Client,
        kind: &dyn ResourceKind,
        resource: &Value,
    ) -> Result<(), EngineError> {
        let name = self.name();
        let addr = kind.addr(resource);
        tracing::info!(operation = name, %addr, "executing operation");

        let result = match self {
            Self::Create(op) => op.execute(client, kind, resource).await,
            Self::Update(op) => op.execute(client, kind, resource).await,
            Self::Delete(op) => op.execute(client, kind, resource).await,
        };
        result.map_err(|e| match e {
            EngineError::Client(source) => {
                tracing::warn!(operation = name, %addr, error = %source, "operation failed");
                EngineError::Operation {
                    operation: name.to_string(),
                    addr,
                    source,
                }
            }
            other => other,
        })
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
