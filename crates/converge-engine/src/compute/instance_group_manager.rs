use converge_client::Method;
use converge_core::{FieldDescriptor, FieldKind, Schema};
use serde_json::Value;

use super::{replace_body, Scope};
use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::resource::{
    fingerprinted_body, operation_body, path_for, url_param, validate_required, validation_error,
    Endpoint, ResourceKind, UpdateSpec,
};

const PARAMS: &[(&str, &str)] = &[
    ("project", "project"),
    ("location", "location"),
    ("name", "name"),
];

/// A managed instance group, zonal or regional.
pub struct InstanceGroupManager {
    schema: Schema,
    updates: [UpdateSpec; 3],
}

impl InstanceGroupManager {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            updates: [
                UpdateSpec {
                    name: "patch",
                    method: Method::Patch,
                    path: item_path,
                    body: patch_body,
                },
                UpdateSpec {
                    name: "setInstanceTemplate",
                    method: Method::Post,
                    path: set_instance_template_path,
                    body: operation_body,
                },
                UpdateSpec {
                    name: "setTargetPools",
                    method: Method::Post,
                    path: set_target_pools_path,
                    body: set_target_pools_body,
                },
            ],
        }
    }
}

impl Default for InstanceGroupManager {
    fn default() -> Self {
        Self::new()
    }
}

fn fixed_or_percent() -> Schema {
    Schema::new(vec![
        FieldDescriptor::integer("fixed").server_default(),
        FieldDescriptor::integer("percent"),
        FieldDescriptor::integer("calculated").output_only(),
    ])
}

fn schema() -> Schema {
    const PATCH: &[&str] = &["patch"];
    let version = Schema::new(vec![
        FieldDescriptor::string("name"),
        FieldDescriptor::reference("instanceTemplate"),
        FieldDescriptor::object("targetSize", fixed_or_percent()),
    ]);
    let auto_healing = Schema::new(vec![
        FieldDescriptor::reference("healthCheck"),
        FieldDescriptor::integer("initialDelaySec"),
    ]);
    let update_policy = Schema::new(vec![
        FieldDescriptor::enumeration("type").server_default(),
        FieldDescriptor::enumeration("instanceRedistributionType").server_default(),
        FieldDescriptor::enumeration("minimalAction").server_default(),
        FieldDescriptor::object("maxSurge", fixed_or_percent()).server_default(),
        FieldDescriptor::object("maxUnavailable", fixed_or_percent()).server_default(),
        FieldDescriptor::enumeration("replacementMethod").server_default(),
    ]);
    let named_port = Schema::new(vec![
        FieldDescriptor::string("name").required(),
        FieldDescriptor::integer("port").required(),
    ]);
    let distribution_policy = Schema::new(vec![
        FieldDescriptor::list(
            "zones",
            FieldKind::Object(Schema::new(vec![FieldDescriptor::reference("zone")])),
        ),
        FieldDescriptor::enumeration("targetShape").server_default(),
    ]);

    Schema::new(vec![
        FieldDescriptor::string("id").output_only(),
        FieldDescriptor::string("creationTimestamp").output_only(),
        FieldDescriptor::string("name").required().recreate(),
        FieldDescriptor::string("description").recreate(),
        FieldDescriptor::string("zone").output_only(),
        FieldDescriptor::string("region").output_only(),
        FieldDescriptor::object("distributionPolicy", distribution_policy)
            .server_default()
            .recreate(),
        FieldDescriptor::reference("instanceTemplate")
            .server_default()
            .triggers(&["setInstanceTemplate"]),
        FieldDescriptor::list("versions", FieldKind::Object(version))
            .server_default()
            .triggers(PATCH),
        FieldDescriptor::reference("instanceGroup").output_only(),
        FieldDescriptor::list("targetPools", FieldKind::Reference).triggers(&["setTargetPools"]),
        FieldDescriptor::string("baseInstanceName").required().triggers(PATCH),
        FieldDescriptor::string("fingerprint").output_only(),
        FieldDescriptor::map("currentActions").output_only(),
        FieldDescriptor::map("status").output_only(),
        FieldDescriptor::integer("targetSize").triggers(PATCH),
        FieldDescriptor::string("selfLink").output_only(),
        FieldDescriptor::list("autoHealingPolicies", FieldKind::Object(auto_healing))
            .triggers(PATCH),
        FieldDescriptor::object("updatePolicy", update_policy)
            .server_default()
            .triggers(PATCH),
        FieldDescriptor::list("namedPorts", FieldKind::Object(named_port)).triggers(PATCH),
        FieldDescriptor::reference("project").parameter().required().recreate(),
        FieldDescriptor::string("location").parameter().required().recreate(),
    ])
}

fn collection(resource: &Value) -> Result<String, EngineError> {
    let template = format!(
        "projects/{{{{project}}}}/{}/instanceGroupManagers",
        Scope::of(resource).segment()
    );
    path_for(&template, resource, PARAMS)
}

fn item_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/{}", collection(resource)?, url_param(resource, "name")))
}

fn set_instance_template_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/setInstanceTemplate", item_path(resource)?))
}

fn set_target_pools_path(resource: &Value) -> Result<String, EngineError> {
    Ok(format!("{}/setTargetPools", item_path(resource)?))
}

fn patch_body(
    spec: &UpdateSpec,
    schema: &Schema,
    desired: &Value,
    current: &Value,
) -> Result<Value, EngineError> {
    fingerprinted_body(spec, schema, desired, current, "fingerprint")
}

fn set_target_pools_body(
    _spec: &UpdateSpec,
    _schema: &Schema,
    desired: &Value,
    current: &Value,
) -> Result<Value, EngineError> {
    Ok(replace_body(desired, current, "targetPools", "fingerprint"))
}

impl ResourceKind for InstanceGroupManager {
    fn resource_type(&self) -> &'static str {
        "compute.instance_group_manager"
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
        validate_required(self.resource_type(), &self.schema, resource)?;
        if Scope::of(resource) == Scope::Global {
            return Err(validation_error(
                self,
                format!(
                    "location {:?} is neither a region nor a zone",
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
