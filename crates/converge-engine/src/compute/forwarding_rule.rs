use converge_client::Method;
use converge_core::{Equality, FieldDescriptor, FieldKind, Schema};
use serde_json::{json, Value};

use super::{replace_body, Scope};
use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::resource::{
    operation_body, path_for, url_param, validation_error, Endpoint, ResourceKind, UpdateSpec,
};

const PARAMS: &[(&str, &str)] = &[
    ("project", "project"),
    ("location", "location"),
    ("name", "name"),
];

/// A regional or global forwarding rule, depending on `location`.
pub struct ForwardingRule {
    schema: Schema,
    updates: [UpdateSpec; 3],
}

impl ForwardingRule {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            updates: [
                UpdateSpec {
                    name: "setLabels",
                    method: Method::Post,
                    path: set_labels_path,
                    body: set_labels_body,
                },
                UpdateSpec {
                    name: "update",
                    method: Method::Patch,
                    path: item_path,
                    body: operation_body,
                },
                UpdateSpec {
                    name: "setTarget",
                    method: Method::Post,
                    path: set_target_path,
                    body: operation_body,
                },
            ],
        }
    }
}

impl Default for ForwardingRule {
    fn default() -> Self {
        Self::new()
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::map("labels").triggers(&["setLabels"]),
        FieldDescriptor::boolean("allPorts").recreate(),
        FieldDescriptor::boolean("allowGlobalAccess").triggers(&["update"]),
        FieldDescriptor::string("labelFingerprint").output_only(),
        FieldDescriptor::reference("backendService").recreate(),
        FieldDescriptor::string("creationTimestamp").output_only(),
        FieldDescriptor::string("description").recreate(),
        FieldDescriptor::string("IPAddress")
            .equality(Equality::IpAddressOrReference)
            .server_default()
            .recreate(),
        FieldDescriptor::enumeration("IPProtocol").server_default().recreate(),
        FieldDescriptor::enumeration("ipVersion").recreate(),
        FieldDescriptor::boolean("isMirroringCollector").recreate(),
        FieldDescriptor::enumeration("loadBalancingScheme")
            .default_value(json!("EXTERNAL"))
            .recreate(),
        FieldDescriptor::string("name").required().recreate(),
        FieldDescriptor::reference("network").server_default().recreate(),
        FieldDescriptor::enumeration("networkTier").server_default().recreate(),
        FieldDescriptor::string("portRange").equality(Equality::PortRange).recreate(),
        FieldDescriptor::set("ports", FieldKind::String).recreate(),
        FieldDescriptor::string("region").output_only(),
        FieldDescriptor::string("selfLink").output_only(),
        FieldDescriptor::string("serviceLabel").recreate(),
        FieldDescriptor::string("serviceName").output_only(),
        FieldDescriptor::reference("subnetwork").server_default().recreate(),
        FieldDescriptor::reference("target").triggers(&["setTarget"]),
        FieldDescriptor::reference("project").parameter().required().recreate(),
        FieldDescriptor::string("location").parameter().required().recreate(),
    ])
}

fn collection(resource: &Value) -> Result<String, EngineError> {
    let template = format!(
        "projects/{{{{project}}}}/{}/forwardingRules",
        Scope::of(resource).segment()
    );
    path_for(&template, resource, PARAMS)
}

fn item_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/{}", collection(resource)?, url_param(resource, "name")))
}

fn set_labels_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/setLabels", item_path(resource)?))
}

fn set_target_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/setTarget", item_path(resource)?))
}

/// setLabels replaces the whole label map and is guarded by the current
/// `labelFingerprint`.
fn set_labels_body(
    _spec: &UpdateSpec,
    _schema: &Schema,
    desired: &Value,
    current: &Value,
) -> Result<Value, EngineError> {
    Ok(replace_body(desired, current, "labels", "labelFingerprint"))
}

impl ResourceKind for ForwardingRule {
    fn resource_type(&self) -> &'static str {
        "compute.forwarding_rule"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn addr(&self, resource: &Value) -> ResourceAddr {
        ResourceAddr {
            resource_type: self.resource_type().to_string(),
            parent: collection(resource).unwrap_or_default(),
            name: url_param(resource, "name"),
        }
    }

    fn validate(&self, resource: &Value) -> Result<(), EngineError> {
        crate::resource::validate_required(self.resource_type(), &self.schema, resource)?;
        if Scope::of(resource) == Scope::Zone {
            return Err(validation_error(
                self,
                format!(
                    "location {} is a zone; forwarding rules are regional or global",
                    url_param(resource, "location")
                ),
            ));
        }
        Ok(())
    }

    fn get_path(&self, resource: &Value) -> Result<String, EngineError> {
        item_path(resource)
    }

    fn list_path(&self, parent: &Value) -> Result<String, EngineError> {
        collection(parent)
    }

    fn create_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Post, collection(resource)?))
    }

    fn delete_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Delete, item_path(resource)?))
    }

    fn update_specs(&self) -> &[UpdateSpec] {
        &self.updates
    }
}
