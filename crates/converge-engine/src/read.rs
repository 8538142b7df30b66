use converge_client::{template, Client};
use converge_core::canonicalize_new_state;
use serde_json::Value;
use tracing::Instrument;

use crate::error::EngineError;
use crate::resource::{flatten, resolve, ResourceKind};
use crate::scope::{call_client, with_deadline};

/// Fetch one resource, canonicalized against the request so that fields the
/// caller wrote in short form come back in that form.
pub async fn get(
    client: &Client,
    kind: &dyn ResourceKind,
    resource: &Value,
) -> Result<Value, EngineError> {
    let client = call_client(client);
    let span = tracing::info_span!(
        "get",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    with_deadline(&client, fetch(&client, kind, resource))
        .instrument(span)
        .await
}

/// Raw JSON as the server returned it.
pub(crate) async fn fetch_raw(
    client: &Client,
    kind: &dyn ResourceKind,
    resource: &Value,
) -> Result<Value, EngineError> {
    let url = resolve(client, kind, &kind.get_path(resource)?);
    match client.get_json(&url).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.is_not_found() => Err(EngineError::NotFound {
            addr: kind.addr(resource),
        }),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn fetch(
    client: &Client,
    kind: &dyn ResourceKind,
    resource: &Value,
) -> Result<Value, EngineError> {
    let raw = fetch_raw(client, kind, resource).await?;
    let state = canonicalize_new_state(kind.schema(), &flatten(kind.schema(), &raw), resource);
    tracing::debug!(addr = %kind.addr(resource), "retrieved resource state");
    Ok(state)
}

/// Not-found is `None`, not an error.
pub(crate) async fn fetch_optional(
    client: &Client,
    kind: &dyn ResourceKind,
    resource: &Value,
) -> Result<Option<Value>, EngineError> {
    match fetch(client, kind, resource).await {
        Ok(state) => Ok(Some(state)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// One page of a listing plus what is needed to fetch the next.
#[derive(Debug, Clone)]
pub struct ResourceList {
    pub items: Vec<Value>,
    next_page_token: String,
    page_size: Option<u32>,
    parent: Value,
}

impl ResourceList {
    pub fn has_next(&self) -> bool {
        !self.next_page_token.is_empty()
    }

    /// Replace `items` with the next page. A no-op on the last page.
    pub async fn next(
        &mut self,
        client: &Client,
        kind: &dyn ResourceKind,
    ) -> Result<(), EngineError> {
        if !self.has_next() {
            return Ok(());
        }
        let client = call_client(client);
        let (items, token) = with_deadline(
            &client,
            list_page(&client, kind, &self.parent, &self.next_page_token, self.page_size),
        )
        .await?;
        self.items = items;
        self.next_page_token = token;
        Ok(())
    }
}

/// List resources under `parent`, which carries the identity parameters
/// (project, location, ...). `page_size: None` leaves paging to the server.
pub async fn list(
    client: &Client,
    kind: &dyn ResourceKind,
    parent: &Value,
    page_size: Option<u32>,
) -> Result<ResourceList, EngineError> {
    let client = call_client(client);
    let span = tracing::info_span!(
        "list",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    let (items, token) = with_deadline(&client, list_page(&client, kind, parent, "", page_size))
        .instrument(span)
        .await?;
    Ok(ResourceList {
        items,
        next_page_token: token,
        page_size,
        parent: parent.clone(),
    })
}

async fn list_page(
    client: &Client,
    kind: &dyn ResourceKind,
    parent: &Value,
    page_token: &str,
    page_size: Option<u32>,
) -> Result<(Vec<Value>, String), EngineError> {
    let mut query = Vec::new();
    if !page_token.is_empty() {
        query.push(("pageToken", page_token.to_string()));
    }
    if let Some(size) = page_size {
        query.push(("maxResults", size.to_string()));
    }
    let url = template::with_query(&resolve(client, kind, &kind.list_path(parent)?), &query)?;
    let body = client.get_json(&url).await?;

    let items: Vec<Value> = body
        .get(kind.list_items_key())
        .and_then(Value::as_array)
        .map(|raw| {
            raw.iter()
                .map(|item| with_parent(kind, parent, flatten(kind.schema(), item)))
                .collect()
        })
        .unwrap_or_default();
    let token = body
        .get("nextPageToken")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    tracing::debug!(count = items.len(), has_next = !token.is_empty(), "listed page");
    Ok((items, token))
}

/// Listed items inherit the parent's identity parameters.
fn with_parent(kind: &dyn ResourceKind, parent: &Value, mut item: Value) -> Value {
    if let (Some(obj), Some(p)) = (item.as_object_mut(), parent.as_object()) {
        for field in kind.schema().fields().iter().filter(|f| f.parameter) {
            if let Some(v) = p.get(field.name) {
                obj.insert(field.name.to_string(), v.clone());
            }
        }
    }
    item
}

/// Every item under `parent`, following page tokens to the end.
pub(crate) async fn list_all(
    client: &Client,
    kind: &dyn ResourceKind,
    parent: &Value,
) -> Result<Vec<Value>, EngineError> {
    let mut items = Vec::new();
    let mut token = String::new();
    loop {
        let (page, next) = list_page(client, kind, parent, &token, None).await?;
        items.extend(page);
        if next.is_empty() {
            return Ok(items);
        }
        token = next;
    }
}
