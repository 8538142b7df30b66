use converge_client::Client;
use serde_json::Value;
use tracing::Instrument;

use crate::error::EngineError;
use crate::operation::ApiOperation;
use crate::read::list_all;
use crate::resource::ResourceKind;
use crate::scope::{call_client, with_deadline};

/// Delete one resource. A resource that is already gone is not an error.
pub async fn delete(
    client: &Client,
    kind: &dyn ResourceKind,
    resource: &Value,
) -> Result<(), EngineError> {
    let client = call_client(client);
    let span = tracing::info_span!(
        "delete",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    let mut op = ApiOperation::delete();
    with_deadline(&client, op.execute(&client, kind, resource))
        .instrument(span)
        .await
}

/// Delete every resource under `parent` that `filter` accepts.
///
/// Failures do not stop the sweep; they are collected into
/// [`EngineError::DeleteAll`]. Returns the number deleted.
pub async fn delete_all<F>(
    client: &Client,
    kind: &dyn ResourceKind,
    parent: &Value,
    filter: F,
) -> Result<usize, EngineError>
where
    F: Fn(&Value) -> bool,
{
    let client = call_client(client);
    let span = tracing::info_span!(
        "delete_all",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    let sweep = async {
        let items = list_all(&client, kind, parent).await?;
        let mut deleted = 0usize;
        let mut failures = Vec::new();
        for item in items.iter().filter(|item| filter(item)) {
            let addr = kind.addr(item);
            match ApiOperation::delete().execute(&client, kind, item).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(%addr, error = %e, "delete failed");
                    failures.push(format!("{addr}: {e}"));
                }
            }
        }
        tracing::info!(deleted, failed = failures.len(), "delete sweep finished");
        if failures.is_empty() {
            Ok(deleted)
        } else {
            Err(EngineError::DeleteAll { failures })
        }
    };
    with_deadline(&client, sweep).instrument(span).await
}
