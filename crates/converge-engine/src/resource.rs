use std::fmt;

use converge_client::{template, Client, Method};
use converge_core::normalize::{is_empty, self_link_to_name};
use converge_core::{fill_defaults, FieldKind, OperationSelector, Schema};
use serde_json::{Map, Value};

use crate::addr::ResourceAddr;
use crate::error::EngineError;

pub const COMPUTE_BASE_PATH: &str = "https://compute.googleapis.com/compute/v1/";

/// Method and base-relative path for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

pub type PathBuilder = fn(&Value) -> Result<String, EngineError>;

/// Builds an update body from the desired resource and the raw current
/// server state (the source of fingerprints).
pub type BodyBuilder = fn(&UpdateSpec, &Schema, &Value, &Value) -> Result<Value, EngineError>;

/// One named in-place update a resource type supports.
#[derive(Clone, Copy)]
pub struct UpdateSpec {
    pub name: &'static str,
    pub method: Method,
    pub path: PathBuilder,
    pub body: BodyBuilder,
}

impl fmt::Debug for UpdateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateSpec")
            .field("name", &self.name)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// One impl per resource type: its field table plus how to address it.
///
/// Everything here is synchronous and side-effect free; the engine owns
/// all I/O.
pub trait ResourceKind: Send + Sync {
    /// e.g. `compute.network`
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    fn base_path(&self) -> &'static str {
        COMPUTE_BASE_PATH
    }

    fn addr(&self, resource: &Value) -> ResourceAddr;

    /// Required-field checks; resource types add their own on top.
    fn validate(&self, resource: &Value) -> Result<(), EngineError> {
        validate_required(self.resource_type(), self.schema(), resource)
    }

    fn get_path(&self, resource: &Value) -> Result<String, EngineError>;

    /// `parent` carries the identity parameters (project, location, ...).
    fn list_path(&self, parent: &Value) -> Result<String, EngineError>;

    fn create_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError>;

    fn delete_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError>;

    fn update_specs(&self) -> &[UpdateSpec];

    /// Key of the item array in list responses.
    fn list_items_key(&self) -> &'static str {
        "items"
    }

    /// Whether a finished operation's `targetLink` names this resource.
    /// Rules inside a policy report the policy instead.
    fn operation_targets_resource(&self) -> bool {
        true
    }

    fn create_body(&self, resource: &Value) -> Value {
        expand(self.schema(), resource)
    }

    fn update_spec(&self, name: &str) -> Option<&UpdateSpec> {
        self.update_specs().iter().find(|s| s.name == name)
    }

    fn operation_names(&self) -> Vec<&'static str> {
        self.update_specs().iter().map(|s| s.name).collect()
    }
}

/// Identity parameter as it appears in a URL: strings reduced to their last
/// path segment, numbers printed, anything else empty.
pub fn url_param(resource: &Value, field: &str) -> String {
    match resource.get(field) {
        Some(Value::String(s)) => self_link_to_name(s).to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Expand a URL template against a resource's identity parameters.
pub fn path_for(
    template_str: &str,
    resource: &Value,
    params: &[(&str, &str)],
) -> Result<String, EngineError> {
    let values: Vec<(&str, String)> = params
        .iter()
        .map(|(key, field)| (*key, url_param(resource, field)))
        .collect();
    let pairs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
    Ok(template::expand(template_str, &pairs)?)
}

/// Absolute URL for a base-relative path.
pub fn resolve(client: &Client, kind: &dyn ResourceKind, path: &str) -> String {
    template::join(client.base_path_or(kind.base_path()), path)
}

/// Wire body: every sent, non-empty field, with output-only fields stripped
/// at every depth.
pub fn expand(schema: &Schema, resource: &Value) -> Value {
    let Some(obj) = resource.as_object() else {
        return resource.clone();
    };
    let mut out = Map::new();
    for field in schema.fields() {
        if !field.is_sent() {
            continue;
        }
        let value = obj.get(field.name);
        if is_empty(value) {
            continue;
        }
        if let Some(v) = value {
            out.insert(field.name.to_string(), expand_value(&field.kind, v));
        }
    }
    Value::Object(out)
}

fn expand_value(kind: &FieldKind, value: &Value) -> Value {
    match (kind, value) {
        (FieldKind::Object(nested), Value::Object(_)) => expand(nested, value),
        (FieldKind::List(element) | FieldKind::Set(element), Value::Array(items)) => {
            Value::Array(items.iter().map(|v| expand_value(element, v)).collect())
        }
        _ => value.clone(),
    }
}

/// Default server-side values for fields the response omitted.
pub fn flatten(schema: &Schema, raw: &Value) -> Value {
    fill_defaults(schema, raw)
}

fn kind_triggers(kind: &FieldKind, operation: &str) -> bool {
    match kind {
        FieldKind::Object(nested) => nested
            .fields()
            .iter()
            .any(|f| selector_triggers(f.selector, operation) || kind_triggers(&f.kind, operation)),
        FieldKind::List(element) | FieldKind::Set(element) => kind_triggers(element, operation),
        _ => false,
    }
}

fn selector_triggers(selector: Option<OperationSelector>, operation: &str) -> bool {
    matches!(
        selector,
        Some(OperationSelector::Triggers(ops)) if ops.iter().any(|op| *op == operation)
    )
}

/// Default [`BodyBuilder`]: the top-level fields this operation may
/// mutate, expanded to wire form.
pub fn operation_body(
    spec: &UpdateSpec,
    schema: &Schema,
    desired: &Value,
    _current: &Value,
) -> Result<Value, EngineError> {
    let mut out = Map::new();
    let Some(obj) = desired.as_object() else {
        return Ok(Value::Object(out));
    };
    for field in schema.fields() {
        if !field.is_sent() {
            continue;
        }
        if !selector_triggers(field.selector, spec.name) && !kind_triggers(&field.kind, spec.name) {
            continue;
        }
        if let Some(v) = obj.get(field.name).filter(|v| !is_empty(Some(*v))) {
            out.insert(field.name.to_string(), expand_value(&field.kind, v));
        }
    }
    Ok(Value::Object(out))
}

/// [`operation_body`] plus a fingerprint copied from the current state,
/// for operations the server guards with optimistic concurrency.
pub fn fingerprinted_body(
    spec: &UpdateSpec,
    schema: &Schema,
    desired: &Value,
    current: &Value,
    fingerprint_field: &str,
) -> Result<Value, EngineError> {
    let mut body = operation_body(spec, schema, desired, current)?;
    if let (Some(obj), Some(fp)) = (body.as_object_mut(), current.get(fingerprint_field)) {
        obj.insert(fingerprint_field.to_string(), fp.clone());
    }
    Ok(body)
}

/// Every `required` field must be non-empty, including inside present
/// nested objects.
pub fn validate_required(
    resource_type: &str,
    schema: &Schema,
    resource: &Value,
) -> Result<(), EngineError> {
    let Some(obj) = resource.as_object() else {
        return Err(EngineError::Validation {
            resource_type: resource_type.to_string(),
            message: "resource must be a JSON object".to_string(),
        });
    };
    check_required(resource_type, schema, obj, "")
}

fn check_required(
    resource_type: &str,
    schema: &Schema,
    obj: &Map<String, Value>,
    prefix: &str,
) -> Result<(), EngineError> {
    for field in schema.fields() {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        let value = obj.get(field.name);
        if field.required && is_empty(value) {
            return Err(EngineError::Validation {
                resource_type: resource_type.to_string(),
                message: format!("missing required field {path}"),
            });
        }
        match (&field.kind, value) {
            (FieldKind::Object(nested), Some(Value::Object(inner))) => {
                check_required(resource_type, nested, inner, &path)?;
            }
            (FieldKind::List(element) | FieldKind::Set(element), Some(Value::Array(items))) => {
                if let FieldKind::Object(nested) = element.as_ref() {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(inner) = item.as_object() {
                            check_required(resource_type, nested, inner, &format!("{path}[{i}]"))?;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn validation_error(kind: &dyn ResourceKind, message: impl Into<String>) -> EngineError {
    EngineError::Validation {
        resource_type: kind.resource_type().to_string(),
        message: message.into(),
    }
}
