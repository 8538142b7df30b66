use converge_client::Method;
use converge_core::{FieldDescriptor, Schema};
use serde_json::{json, Value};

use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::resource::{operation_body, path_for, url_param, Endpoint, ResourceKind, UpdateSpec};

const COLLECTION: &str = "projects/{{project}}/global/networks";
const ITEM: &str = "projects/{{project}}/global/networks/{{name}}";
const PARAMS: &[(&str, &str)] = &[("project", "project"), ("name", "name")];

/// A VPC network. Only the routing mode and MTU can change in place.
pub struct Network {
    schema: Schema,
    updates: [UpdateSpec; 1],
}

impl Network {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            updates: [UpdateSpec {
                name: "update",
                method: Method::Patch,
                path: item_path,
                body: operation_body,
            }],
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::string("description").recreate(),
        FieldDescriptor::string("gatewayIPv4").output_only().recreate(),
        FieldDescriptor::string("name").required().recreate(),
        FieldDescriptor::boolean("autoCreateSubnetworks")
            .server_default()
            .default_value(json!(true))
            .recreate(),
        FieldDescriptor::object(
            "routingConfig",
            Schema::new(vec![FieldDescriptor::enumeration("routingMode").server_default()]),
        )
        .server_default()
        .triggers(&["update"]),
        FieldDescriptor::integer("mtu").server_default().triggers(&["update"]),
        FieldDescriptor::reference("project").parameter().required().recreate(),
        FieldDescriptor::string("selfLink").output_only(),
        FieldDescriptor::string("selfLinkWithId").output_only(),
    ])
}

fn item_path(resource: &Value) -> Result<String, EngineError> {
    path_for(ITEM, resource, PARAMS)
}

impl ResourceKind for Network {
    fn resource_type(&self) -> &'static str {
        "compute.network"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn addr(&self, resource: &Value) -> ResourceAddr {
        ResourceAddr {
            resource_type: self.resource_type().to_string(),
            parent: format!("projects/{}/global/networks", url_param(resource, "project")),
            name: url_param(resource, "name"),
        }
    }

    fn get_path(&self, resource: &Value) -> Result<String, EngineError> {
        item_path(resource)
    }

    fn list_path(&self, parent: &Value) -> Result<String, EngineError> {
        path_for(COLLECTION, parent, PARAMS)
    }

    fn create_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Post, path_for(COLLECTION, resource, PARAMS)?))
    }

    fn delete_endpoint(&self, resource: &Value) -> Result<Endpoint, EngineError> {
        Ok(Endpoint::new(Method::Delete, item_path(resource)?))
    }

    fn update_specs(&self) -> &[UpdateSpec] {
        &self.updates
    }
}
