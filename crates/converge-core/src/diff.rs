use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::field::{Equality, FieldDescriptor, FieldKind, OperationSelector, Schema};
use crate::normalize::{is_empty, scalar_equivalent};

/// How a diff gets reconciled. A diff never carries both a recreate flag
/// and an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "operations", rename_all = "snake_case")]
pub enum Remedy {
    Recreate,
    Operations(Vec<String>),
    /// The field has no selector. Rejected at plan conversion.
    Unspecified,
}

impl From<Option<OperationSelector>> for Remedy {
    fn from(selector: Option<OperationSelector>) -> Self {
        match selector {
            Some(OperationSelector::RequiresRecreate) => Remedy::Recreate,
            Some(OperationSelector::Triggers(ops)) => {
                Remedy::Operations(ops.iter().map(|op| op.to_string()).collect())
            }
            None => Remedy::Unspecified,
        }
    }
}

/// A difference on one field, addressed by dotted path
/// (`routingConfig.routingMode`, `versions[0].targetSize.fixed`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field_name: String,
    pub desired: Value,
    pub actual: Value,
    pub remedy: Remedy,
}

impl FieldDiff {
    pub fn requires_recreate(&self) -> bool {
        self.remedy == Remedy::Recreate
    }

    pub fn operations(&self) -> &[String] {
        match &self.remedy {
            Remedy::Operations(ops) => ops,
            _ => &[],
        }
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: desired {}, actual {}",
            self.field_name, self.desired, self.actual
        )
    }
}

/// Compare canonical desired state against actual state.
///
/// Both sides must be JSON objects; anything else is a programming error.
/// Diffs come out in field declaration order.
pub fn diff(schema: &Schema, desired: &Value, actual: &Value) -> Result<Vec<FieldDiff>, CoreError> {
    let (Some(d), Some(a)) = (desired.as_object(), actual.as_object()) else {
        return Err(CoreError::NilResource {
            desired: type_name(desired),
            actual: type_name(actual),
        });
    };
    let mut out = Vec::new();
    diff_object(schema, d, a, "", None, &mut out);
    Ok(out)
}

/// True when two objects produce no diffs under `schema`.
pub(crate) fn objects_match(schema: &Schema, desired: &Value, actual: &Value) -> bool {
    match (desired.as_object(), actual.as_object()) {
        (Some(d), Some(a)) => {
            let mut out = Vec::new();
            diff_object(schema, d, a, "", None, &mut out);
            out.is_empty()
        }
        _ => desired == actual,
    }
}

/// Equality for a single list/set element or scalar value.
pub(crate) fn values_match(
    kind: &FieldKind,
    equality: Equality,
    desired: &Value,
    actual: &Value,
) -> bool {
    match kind {
        FieldKind::Object(nested) => match equality {
            Equality::Custom(f) => f(desired, actual),
            _ => objects_match(nested, desired, actual),
        },
        FieldKind::List(_) | FieldKind::Set(_) => desired == actual,
        _ => scalar_equivalent(kind, equality, desired, actual),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn record(
    out: &mut Vec<FieldDiff>,
    path: &str,
    desired: Option<&Value>,
    actual: Option<&Value>,
    remedy: Remedy,
) {
    out.push(FieldDiff {
        field_name: path.to_string(),
        desired: desired.cloned().unwrap_or(Value::Null),
        actual: actual.cloned().unwrap_or(Value::Null),
        remedy,
    });
}

fn diff_object(
    schema: &Schema,
    desired: &Map<String, Value>,
    actual: &Map<String, Value>,
    prefix: &str,
    inherited: Option<OperationSelector>,
    out: &mut Vec<FieldDiff>,
) {
    for field in schema.fields() {
        let selector = field.selector.or(inherited);
        let path = join(prefix, field.name);
        diff_field(
            field,
            desired.get(field.name),
            actual.get(field.name),
            &path,
            selector,
            out,
        );
    }
}

fn diff_field(
    field: &FieldDescriptor,
    desired: Option<&Value>,
    actual: Option<&Value>,
    path: &str,
    selector: Option<OperationSelector>,
    out: &mut Vec<FieldDiff>,
) {
    if field.output_only {
        // Server-assigned: only an explicit, conflicting desired value counts.
        let Some(d) = desired.filter(|_| !is_empty(desired)) else {
            return;
        };
        let mut scratch = Vec::new();
        compare_present(field, d, actual, path, selector, &mut scratch);
        if !scratch.is_empty() {
            record(out, path, desired, actual, Remedy::Recreate);
        }
        return;
    }

    let Some(d) = desired.filter(|_| !is_empty(desired)) else {
        if !field.server_default && !is_empty(actual) {
            record(out, path, desired, actual, selector.into());
        }
        return;
    };
    compare_present(field, d, actual, path, selector, out);
}

fn compare_present(
    field: &FieldDescriptor,
    desired: &Value,
    actual: Option<&Value>,
    path: &str,
    selector: Option<OperationSelector>,
    out: &mut Vec<FieldDiff>,
) {
    let Some(a) = actual.filter(|a| !a.is_null()) else {
        record(out, path, Some(desired), actual, selector.into());
        return;
    };

    if let Equality::Custom(f) = field.equality {
        if !f(desired, a) {
            record(out, path, Some(desired), Some(a), selector.into());
        }
        return;
    }

    match &field.kind {
        FieldKind::Object(nested) => match (desired.as_object(), a.as_object()) {
            (Some(dm), Some(am)) => diff_object(nested, dm, am, path, selector, out),
            _ => record(out, path, Some(desired), Some(a), selector.into()),
        },
        FieldKind::List(element) => diff_list(field, element, desired, a, path, selector, out),
        FieldKind::Set(element) => {
            if !sets_match(field.equality, element, desired, a) {
                record(out, path, Some(desired), Some(a), selector.into());
            }
        }
        kind => {
            if !scalar_equivalent(kind, field.equality, desired, a) {
                record(out, path, Some(desired), Some(a), selector.into());
            }
        }
    }
}

fn diff_list(
    field: &FieldDescriptor,
    element: &FieldKind,
    desired: &Value,
    actual: &Value,
    path: &str,
    selector: Option<OperationSelector>,
    out: &mut Vec<FieldDiff>,
) {
    let (Some(ds), Some(xs)) = (desired.as_array(), actual.as_array()) else {
        record(out, path, Some(desired), Some(actual), selector.into());
        return;
    };
    if ds.len() != xs.len() {
        record(out, path, Some(desired), Some(actual), selector.into());
        return;
    }
    match element {
        FieldKind::Object(nested) => {
            for (i, (de, xe)) in ds.iter().zip(xs).enumerate() {
                let item_path = format!("{path}[{i}]");
                match (de.as_object(), xe.as_object()) {
                    (Some(dm), Some(xm)) => diff_object(nested, dm, xm, &item_path, selector, out),
                    _ if de != xe => record(out, &item_path, Some(de), Some(xe), selector.into()),
                    _ => {}
                }
            }
        }
        kind => {
            let equal = ds
                .iter()
                .zip(xs)
                .all(|(de, xe)| values_match(kind, field.equality, de, xe));
            if !equal {
                record(out, path, Some(desired), Some(actual), selector.into());
            }
        }
    }
}

/// Multiset comparison: every desired element pairs off with a distinct
/// actual element.
pub(crate) fn sets_match(
    equality: Equality,
    element: &FieldKind,
    desired: &Value,
    actual: &Value,
) -> bool {
    let (Some(ds), Some(xs)) = (desired.as_array(), actual.as_array()) else {
        return desired == actual;
    };
    if ds.len() != xs.len() {
        return false;
    }
    let mut pool: Vec<&Value> = xs.iter().collect();
    for de in ds {
        match pool
            .iter()
            .position(|xe| values_match(element, equality, de, xe))
        {
            Some(idx) => {
                pool.swap_remove(idx);
            }
            None => return false,
        }
    }
    true
}
