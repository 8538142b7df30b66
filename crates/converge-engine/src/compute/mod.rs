//! Field tables and endpoints for the bundled compute resource types.

pub mod firewall_policy_rule;
pub mod forwarding_rule;
pub mod instance_group_manager;
pub mod network;

use converge_client::template;
use serde_json::{Map, Value};

use crate::resource::{url_param, ResourceKind};

pub use firewall_policy_rule::FirewallPolicyRule;
pub use forwarding_rule::ForwardingRule;
pub use instance_group_manager::InstanceGroupManager;
pub use network::Network;

/// Every bundled resource type name, as accepted by [`kind_for`].
pub const RESOURCE_TYPES: &[&str] = &[
    "compute.network",
    "compute.forwarding_rule",
    "compute.firewall_policy_rule",
    "compute.instance_group_manager",
];

/// Look up a resource type by name. The `compute.` prefix is optional.
pub fn kind_for(name: &str) -> Option<Box<dyn ResourceKind>> {
    match name.strip_prefix("compute.").unwrap_or(name) {
        "network" => Some(Box::new(Network::new())),
        "forwarding_rule" => Some(Box::new(ForwardingRule::new())),
        "firewall_policy_rule" => Some(Box::new(FirewallPolicyRule::new())),
        "instance_group_manager" => Some(Box::new(InstanceGroupManager::new())),
        _ => None,
    }
}

/// Where a location-scoped resource lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Global,
    Region,
    Zone,
}

impl Scope {
    pub(crate) fn of(resource: &Value) -> Scope {
        let location = url_param(resource, "location");
        if template::is_zone(&location) {
            Scope::Zone
        } else if template::is_region(&location) {
            Scope::Region
        } else {
            Scope::Global
        }
    }

    /// Collection prefix below the project, e.g. `regions/{{location}}`.
    pub(crate) fn segment(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Region => "regions/{{location}}",
            Scope::Zone => "zones/{{location}}",
        }
    }
}

/// Request body for a setter that replaces `field` wholesale under the
/// resource's current fingerprint.
///
/// `desired` is already canonical, so an omitted field has taken the current
/// value and the setter only runs when the field really changed.
pub(crate) fn replace_body(
    desired: &Value,
    current: &Value,
    field: &str,
    fingerprint: &str,
) -> Value {
    let mut body = Map::new();
    if let Some(value) = desired.get(field) {
        body.insert(field.to_string(), value.clone());
    }
    if let Some(fp) = current.get(fingerprint) {
        body.insert(fingerprint.to_string(), fp.clone());
    }
    Value::Object(body)
}
