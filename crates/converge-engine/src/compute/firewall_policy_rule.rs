use converge_client::Method;
use converge_core::{Equality, FieldDescriptor, FieldKind, Schema};
use serde_json::Value;

use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::resource::{operation_body, path_for, url_param, Endpoint, ResourceKind, UpdateSpec};

const POLICY: &str = "locations/global/firewallPolicies/{{firewallPolicy}}";
const PARAMS: &[(&str, &str)] = &[("firewallPolicy", "firewallPolicy"), ("priority", "priority")];

/// One rule inside a hierarchical firewall policy, keyed by priority.
///
/// Rules have no collection of their own: they are read, added and removed
/// through methods on the policy, and listed from the policy's `rules`.
pub struct FirewallPolicyRule {
    schema: Schema,
    updates: [UpdateSpec; 1],
}

impl FirewallPolicyRule {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            updates: [UpdateSpec {
                name: "patchRule",
                method: Method::Post,
                path: patch_path,
                body: operation_body,
            }],
        }
    }
}

impl Default for FirewallPolicyRule {
    fn default() -> Self {
        Self::new()
    }
}

fn layer4_config() -> Schema {
    Schema::new(vec![
        FieldDescriptor::string("ipProtocol").required(),
        FieldDescriptor::set("ports", FieldKind::String).equality(Equality::PortRange),
    ])
}

fn rule_match() -> Schema {
    Schema::new(vec![
        FieldDescriptor::list("srcIpRanges", FieldKind::String),
        FieldDescriptor::list("destIpRanges", FieldKind::String),
        FieldDescriptor::set("layer4Configs", FieldKind::Object(layer4_config())).required(),
    ])
}

fn schema() -> Schema {
    const PATCH: &[&str] = &["patchRule"];
    Schema::new(vec![
        FieldDescriptor::string("description").triggers(PATCH),
        FieldDescriptor::integer("priority").required().recreate(),
        FieldDescriptor::object("match", rule_match()).required().triggers(PATCH),
        FieldDescriptor::string("action").required().triggers(PATCH),
        FieldDescriptor::enumeration("direction").required().triggers(PATCH),
        FieldDescriptor::list("targetResources", FieldKind::Reference).triggers(PATCH),
        FieldDescriptor::boolean("enableLogging").triggers(PATCH),
        FieldDescriptor::integer("ruleTupleCount").output_only(),
        FieldDescriptor::list("targetServiceAccounts", FieldKind::String).triggers(PATCH),
        FieldDescriptor::boolean("disabled").triggers(PATCH),
        FieldDescriptor::string("kind").output_only(),
        FieldDescriptor::reference("firewallPolicy").parameter().required().recreate(),
    ])
}

fn policy_path(resource: &Value) -> Result<String, EngineError> {
    path_for(POLICY, resource, PARAMS)
}

fn rule_path(method: &str, resource: &Value) -> Result<String, EngineError> {
    path_for(&format!("{POLICY}/{method}?priority={{{{priority}}}}"), resource, PARAMS)
}

fn patch_path(resource: &Value) -> Result<String, EngineError> {
    rule_path("patchRule", resource)
}

impl ResourceKind for FirewallPolicyRule {
    fn resource_type(&self) -> &'static str {
        "compute.firewall_policy_rule"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn addr(&self, resource: &Value) -> ResourceAddr {
        ResourceAddr {
            resource_type: self.resource_type().to_string(),
            parent: policy_path(resource).unwrap_or_default(),
            name: url_param(resource, "priority"),
        }
    }

    fn get_path(&self, resource: &Value) -> Result<String, EngineError> {
        rule_path("getRule", resource)
    }

    fn list_path(&self, parent: &Value) -> Result<String, EngineError> {
        policy_path(parent)
    }

    fn list_items_key(&self) -> &'static str {
        "rules"
    }

    fn operation_targets_resource(&self) -> bool {
        false
    }

    fn create_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Post, format!("{}/addRule", policy_path(resource)?)))
    }

    fn delete_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Post, rule_path("removeRule", resource)?))
    }

    fn update_specs(&self) -> &[UpdateSpec] {
        &self.updates
    }
}
