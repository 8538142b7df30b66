//! Value-level helpers shared by canonicalization and diffing.

use std::net::IpAddr;

use serde_json::Value;

use crate::field::{Equality, FieldKind};

/// Unset means absent or JSON null.
pub fn is_unset(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Empty is unset, `""`, `[]` or `{}`. Numbers and booleans are never
/// empty: an explicit `false` or `0` is a real setting.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Last path segment of a self-link or partial resource path.
pub fn self_link_to_name(link: &str) -> &str {
    let trimmed = link.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Strips scheme, host and API version, leaving `projects/...`.
pub fn relative_resource_path(link: &str) -> &str {
    match link.find("projects/") {
        Some(idx) => &link[idx..],
        None => link,
    }
}

/// References match when their resource paths match, when one path is a
/// partial self-link ending the other (`global/networks/default`), or when
/// either side is a bare name and the names match.
pub fn references_equal(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    let l = relative_resource_path(left).trim_end_matches('/');
    let r = relative_resource_path(right).trim_end_matches('/');
    if l.contains('/') && r.contains('/') {
        let (short, long) = if l.len() <= r.len() { (l, r) } else { (r, l) };
        return long
            .strip_suffix(short)
            .is_some_and(|head| head.is_empty() || head.ends_with('/'));
    }
    self_link_to_name(left) == self_link_to_name(right)
}

/// `"80"` becomes `"80-80"`; ranges pass through.
pub fn expand_port_range(range: &str) -> String {
    let range = range.trim();
    if range.contains('-') {
        range.to_string()
    } else {
        format!("{range}-{range}")
    }
}

pub fn port_ranges_equal(left: &str, right: &str) -> bool {
    expand_port_range(left) == expand_port_range(right)
}

pub fn is_ip_literal(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

/// The server reports an address literal where the user may have named an
/// address resource, so a literal on one side and a reference on the other
/// compare equal. Two literals (or two references) must still match.
pub fn ip_addresses_equal(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    match (is_ip_literal(left), is_ip_literal(right)) {
        (true, true) => false,
        (false, false) => references_equal(left, right),
        _ => true,
    }
}

pub fn cpu_platforms_equal(left: &str, right: &str) -> bool {
    left == right
        || left.eq_ignore_ascii_case("automatic")
        || right.eq_ignore_ascii_case("automatic")
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Equality for a scalar (or map) value under a field's rule.
pub fn scalar_equivalent(
    kind: &FieldKind,
    equality: Equality,
    left: &Value,
    right: &Value,
) -> bool {
    if left == right {
        return true;
    }
    let strings = left.as_str().zip(right.as_str());
    match equality {
        Equality::Custom(f) => f(left, right),
        Equality::CpuPlatform => strings.is_some_and(|(l, r)| cpu_platforms_equal(l, r)),
        Equality::PortRange => strings.is_some_and(|(l, r)| port_ranges_equal(l, r)),
        Equality::IpAddressOrReference => strings.is_some_and(|(l, r)| ip_addresses_equal(l, r)),
        Equality::Default => match kind {
            FieldKind::Integer => match (as_i64(left), as_i64(right)) {
                (Some(l), Some(r)) => l == r,
                _ => left == right,
            },
            FieldKind::Double => match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => l == r,
                _ => left == right,
            },
            FieldKind::Reference => match strings {
                Some((l, r)) => references_equal(l, r),
                None => left == right,
            },
            _ => left == right,
        },
    }
}
