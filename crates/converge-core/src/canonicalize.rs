//! Canonicalization: rewrite one state in terms of another so that values
//! which differ only in representation (short name vs. self-link, `"80"` vs.
//! `"80-80"`) stop producing diffs.

use serde_json::{Map, Value};

use crate::diff::{objects_match, values_match};
use crate::field::{Equality, FieldDescriptor, FieldKind, Schema};
use crate::normalize::{is_empty, is_unset, scalar_equivalent};

/// Canonicalize a desired state against the initial (fetched) state.
///
/// With no initial state only defaults are filled in. Keys outside the
/// schema are carried through untouched.
pub fn canonicalize_desired(schema: &Schema, desired: &Value, initial: Option<&Value>) -> Value {
    let Some(d) = desired.as_object() else {
        return desired.clone();
    };
    let initial = initial.and_then(Value::as_object);
    let mut out = Map::new();
    for field in schema.fields() {
        let value = with_default(field, d.get(field.name));
        let init = initial.and_then(|o| o.get(field.name));
        if let Some(v) = canonicalize_field(field, value, init) {
            insert_non_null(&mut out, field.name, v);
        }
    }
    carry_unknown(schema, d, &mut out);
    Value::Object(out)
}

/// Canonicalize a freshly fetched state against the raw desired state,
/// preferring the desired representation wherever the two are equivalent.
/// Parameters (project, location, ...) always come from desired.
pub fn canonicalize_new_state(schema: &Schema, new: &Value, desired: &Value) -> Value {
    let Some(n) = new.as_object() else {
        return new.clone();
    };
    let d = desired.as_object();
    let mut out = Map::new();
    for field in schema.fields() {
        let nv = n.get(field.name);
        let dv = d.and_then(|d| d.get(field.name));
        let value = if field.parameter {
            prefer(dv, nv)
        } else {
            canonicalize_new_field(field, nv, dv)
        };
        if let Some(v) = value {
            insert_non_null(&mut out, field.name, v);
        }
    }
    carry_unknown(schema, n, &mut out);
    Value::Object(out)
}

/// Fill fields the fetched state left empty from a create response.
pub fn merge_server_fields(schema: &Schema, new: &Value, response: &Value) -> Value {
    let (Some(n), Some(r)) = (new.as_object(), response.as_object()) else {
        return new.clone();
    };
    let mut out = n.clone();
    for field in schema.fields() {
        let incoming = r.get(field.name);
        if is_empty(n.get(field.name)) && !is_empty(incoming) {
            if let Some(v) = incoming {
                out.insert(field.name.to_string(), v.clone());
            }
        }
    }
    Value::Object(out)
}

/// Apply declared defaults to unset fields, recursing into objects.
pub fn fill_defaults(schema: &Schema, value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let mut out = obj.clone();
    for field in schema.fields() {
        match (&field.kind, obj.get(field.name)) {
            (FieldKind::Object(nested), Some(v @ Value::Object(_))) => {
                out.insert(field.name.to_string(), fill_defaults(nested, v));
            }
            (_, current) if is_unset(current) => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                }
            }
            _ => {}
        }
    }
    Value::Object(out)
}

fn with_default<'a>(field: &'a FieldDescriptor, value: Option<&'a Value>) -> Option<&'a Value> {
    if is_unset(value) {
        field.default.as_ref().or(value)
    } else {
        value
    }
}

fn prefer<'a>(first: Option<&'a Value>, second: Option<&'a Value>) -> Option<Value> {
    if is_unset(first) {
        second.cloned()
    } else {
        first.cloned()
    }
}

fn insert_non_null(out: &mut Map<String, Value>, name: &str, value: Value) {
    if !value.is_null() {
        out.insert(name.to_string(), value);
    }
}

fn carry_unknown(schema: &Schema, src: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in src {
        if schema.field(key).is_none() && !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
}

fn canonicalize_field(
    field: &FieldDescriptor,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    match &field.kind {
        FieldKind::Object(nested) => canonicalize_object(nested, desired, initial),
        FieldKind::List(element) => canonicalize_list(field, element, desired, initial),
        FieldKind::Set(element) => canonicalize_set(field, element, desired, initial),
        kind => {
            if is_empty(desired) {
                return prefer(initial, desired);
            }
            match (desired, initial) {
                (Some(d), Some(i)) if scalar_equivalent(kind, field.equality, d, i) => {
                    Some(i.clone())
                }
                _ => desired.cloned(),
            }
        }
    }
}

fn canonicalize_object(
    nested: &Schema,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    match desired {
        None | Some(Value::Null) => initial.cloned(),
        // An explicit empty object means "empty on purpose".
        Some(Value::Object(m)) if m.is_empty() => desired.cloned(),
        Some(d @ Value::Object(_)) => Some(canonicalize_desired(nested, d, initial)),
        Some(other) => Some(other.clone()),
    }
}

fn canonicalize_element(element: &FieldKind, desired: &Value, initial: Option<&Value>) -> Value {
    match element {
        FieldKind::Object(nested) if desired.is_object() => {
            canonicalize_desired(nested, desired, initial)
        }
        _ => initial.unwrap_or(desired).clone(),
    }
}

fn canonicalize_list(
    field: &FieldDescriptor,
    element: &FieldKind,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    if is_empty(desired) {
        return prefer(initial, desired);
    }
    let Some(ds) = desired.and_then(Value::as_array) else {
        return desired.cloned();
    };
    let xs = initial.and_then(Value::as_array);
    match element {
        FieldKind::Object(_) => {
            // Positional pairing only when lengths agree; otherwise each
            // element stands alone with defaults.
            let paired = xs.filter(|xs| xs.len() == ds.len());
            let items = ds
                .iter()
                .enumerate()
                .map(|(k, de)| canonicalize_element(element, de, paired.and_then(|xs| xs.get(k))))
                .collect();
            Some(Value::Array(items))
        }
        kind => match xs {
            Some(xs)
                if xs.len() == ds.len()
                    && ds
                        .iter()
                        .zip(xs)
                        .all(|(de, xe)| values_match(kind, field.equality, de, xe)) =>
            {
                initial.cloned()
            }
            _ => desired.cloned(),
        },
    }
}

fn element_matches(
    element: &FieldKind,
    equality: Equality,
    desired: &Value,
    actual: &Value,
) -> bool {
    match (element, equality) {
        (FieldKind::Object(nested), Equality::Default) => {
            objects_match(nested, &canonicalize_desired(nested, desired, Some(actual)), actual)
        }
        _ => values_match(element, equality, desired, actual),
    }
}

fn canonicalize_set(
    field: &FieldDescriptor,
    element: &FieldKind,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    if is_empty(desired) {
        return prefer(initial, desired);
    }
    let Some(ds) = desired.and_then(Value::as_array) else {
        return desired.cloned();
    };
    let mut pool: Vec<&Value> = initial
        .and_then(Value::as_array)
        .map(|xs| xs.iter().collect())
        .unwrap_or_default();

    // Matching only picks each element's representation. Actual elements
    // nobody asked for are left out so the diff can remove them.
    let mut items = Vec::with_capacity(ds.len());
    for de in ds {
        let matched = pool
            .iter()
            .position(|xe| element_matches(element, field.equality, de, xe))
            .map(|idx| pool.remove(idx));
        items.push(canonicalize_element(element, de, matched));
    }
    Some(Value::Array(items))
}

fn canonicalize_new_field(
    field: &FieldDescriptor,
    new: Option<&Value>,
    desired: Option<&Value>,
) -> Option<Value> {
    if is_empty(new) && is_empty(desired) {
        return prefer(desired, new);
    }
    let (Some(nv), Some(dv)) = (new, desired.filter(|_| !is_empty(desired))) else {
        return new.cloned();
    };
    match &field.kind {
        FieldKind::Object(nested) if nv.is_object() && dv.is_object() => {
            Some(canonicalize_new_state(nested, nv, dv))
        }
        FieldKind::Object(_) => Some(nv.clone()),
        FieldKind::List(element) => canonicalize_new_list(field, element, nv, dv),
        FieldKind::Set(element) => canonicalize_new_set(field, element, nv, dv),
        kind => {
            if scalar_equivalent(kind, field.equality, dv, nv) {
                Some(dv.clone())
            } else {
                Some(nv.clone())
            }
        }
    }
}

fn canonicalize_new_list(
    field: &FieldDescriptor,
    element: &FieldKind,
    new: &Value,
    desired: &Value,
) -> Option<Value> {
    let (Some(ns), Some(ds)) = (new.as_array(), desired.as_array()) else {
        return Some(new.clone());
    };
    if ns.len() != ds.len() {
        return Some(new.clone());
    }
    match element {
        FieldKind::Object(nested) => Some(Value::Array(
            ns.iter()
                .zip(ds)
                .map(|(ne, de)| canonicalize_new_state(nested, ne, de))
                .collect(),
        )),
        kind => {
            let equal = ds
                .iter()
                .zip(ns)
                .all(|(de, ne)| values_match(kind, field.equality, de, ne));
            Some(if equal { desired.clone() } else { new.clone() })
        }
    }
}

fn canonicalize_new_set(
    field: &FieldDescriptor,
    element: &FieldKind,
    new: &Value,
    desired: &Value,
) -> Option<Value> {
    let (Some(ns), Some(ds)) = (new.as_array(), desired.as_array()) else {
        return Some(new.clone());
    };
    let mut pool: Vec<&Value> = ds.iter().collect();
    let items = ns
        .iter()
        .map(|ne| {
            let matched = pool
                .iter()
                .position(|de| element_matches(element, field.equality, de, ne))
                .map(|idx| pool.remove(idx));
            match (element, matched) {
                (FieldKind::Object(nested), Some(de)) => canonicalize_new_state(nested, ne, de),
                (_, Some(de)) => de.clone(),
                (_, None) => ne.clone(),
            }
        })
        .collect();
    Some(Value::Array(items))
}
