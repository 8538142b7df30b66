use converge_core::{diff, CoreError, Equality, FieldDescriptor, FieldKind, Remedy, Schema};
use serde_json::json;

fn network() -> Schema {
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
    ])
}

#[test]
fn mtu_change_is_one_update_diff() {
    let desired = json!({"name": "net1", "project": "p", "mtu": 1460});
    let actual = json!({
        "name": "net1",
        "project": "p",
        "mtu": 1500,
        "autoCreateSubnetworks": true,
    });

    let diffs = diff(&network(), &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "mtu");
    assert_eq!(diffs[0].remedy, Remedy::Operations(vec!["update".to_string()]));
    assert!(!diffs[0].requires_recreate());
}

#[test]
fn name_change_requires_recreate() {
    let desired = json!({"name": "net2", "project": "p"});
    let actual = json!({"name": "net1", "project": "p"});

    let diffs = diff(&network(), &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].requires_recreate());
    assert!(diffs[0].operations().is_empty());
}

#[test]
fn server_default_absent_in_desired_is_not_a_diff() {
    let desired = json!({"name": "net1", "project": "p"});
    let actual = json!({
        "name": "net1",
        "project": "p",
        "mtu": 1460,
        "routingConfig": {"routingMode": "REGIONAL"},
    });
    assert!(diff(&network(), &desired, &actual).unwrap().is_empty());
}

#[test]
fn absent_on_both_sides_is_not_a_diff() {
    let desired = json!({"name": "net1", "project": "p", "description": ""});
    let actual = json!({"name": "net1", "project": "p"});
    assert!(diff(&network(), &desired, &actual).unwrap().is_empty());
}

#[test]
fn non_default_field_absent_in_desired_diffs_against_set_actual() {
    let desired = json!({"name": "net1", "project": "p"});
    let actual = json!({"name": "net1", "project": "p", "description": "old"});

    let diffs = diff(&network(), &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "description");
}

#[test]
fn output_only_fields_are_ignored_unless_desired_conflicts() {
    let actual = json!({
        "name": "net1",
        "project": "p",
        "selfLink": "https://x/net1",
        "gatewayIPv4": "10.0.0.1",
    });

    let desired = json!({"name": "net1", "project": "p"});
    assert!(diff(&network(), &desired, &actual).unwrap().is_empty());

    let conflicting = json!({"name": "net1", "project": "p", "gatewayIPv4": "10.9.9.9"});
    let diffs = diff(&network(), &conflicting, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "gatewayIPv4");
    assert!(diffs[0].requires_recreate());
}

#[test]
fn nested_fields_inherit_parent_selector_and_get_dotted_paths() {
    let desired =
        json!({"name": "net1", "project": "p", "routingConfig": {"routingMode": "GLOBAL"}});
    let actual =
        json!({"name": "net1", "project": "p", "routingConfig": {"routingMode": "REGIONAL"}});

    let diffs = diff(&network(), &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "routingConfig.routingMode");
    assert_eq!(diffs[0].operations(), ["update".to_string()]);
}

#[test]
fn references_compare_by_name() {
    let desired = json!({"name": "net1", "project": "p"});
    let actual = json!({"name": "net1", "project": "projects/p"});
    assert!(diff(&network(), &desired, &actual).unwrap().is_empty());
}

#[test]
fn integers_compare_numerically_across_representations() {
    let desired = json!({"name": "net1", "project": "p", "mtu": "1460"});
    let actual = json!({"name": "net1", "project": "p", "mtu": 1460});
    assert!(diff(&network(), &desired, &actual).unwrap().is_empty());
}

#[test]
fn partial_self_link_matches_the_full_link() {
    let schema =
        Schema::new(vec![FieldDescriptor::reference("network").server_default().recreate()]);
    let full = json!({
        "network": "https://compute.googleapis.com/compute/v1/projects/p/global/networks/default",
    });
    let diffs_for = |network: &str| diff(&schema, &json!({"network": network}), &full).unwrap();

    assert!(diffs_for("global/networks/default").is_empty());
    assert!(diffs_for("projects/p/global/networks/default").is_empty());
    assert!(diffs_for("default").is_empty());
    assert_eq!(diffs_for("global/networks/other").len(), 1);
    assert_eq!(diffs_for("networks/xdefault").len(), 1);
    assert_eq!(diffs_for("projects/q/global/networks/default").len(), 1);
}

#[test]
fn doubles_compare_numerically() {
    let schema = Schema::new(vec![FieldDescriptor::double("utilization").triggers(&["patch"])]);
    let actual = json!({"utilization": 0.5});

    assert!(diff(&schema, &json!({"utilization": "0.5"}), &actual).unwrap().is_empty());
    let diffs = diff(&schema, &json!({"utilization": 0.8}), &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].operations(), ["patch".to_string()]);
}

#[test]
fn non_object_resource_is_a_programming_error() {
    let err = diff(&network(), &json!(null), &json!({})).unwrap_err();
    assert!(matches!(err, CoreError::NilResource { desired: "null", .. }));
}

#[test]
fn untagged_field_diff_is_unspecified() {
    let schema = Schema::new(vec![FieldDescriptor::string("color")]);
    let diffs = diff(&schema, &json!({"color": "red"}), &json!({"color": "blue"})).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].remedy, Remedy::Unspecified);
}

fn firewall_match() -> Schema {
    let layer4 = Schema::new(vec![
        FieldDescriptor::string("ipProtocol"),
        FieldDescriptor::set("ports", FieldKind::String).equality(Equality::PortRange),
    ]);
    Schema::new(vec![FieldDescriptor::object(
        "match",
        Schema::new(vec![FieldDescriptor::set("layer4Configs", FieldKind::Object(layer4))]),
    )
    .triggers(&["patchRule"])])
}

#[test]
fn sets_of_objects_ignore_order_and_use_element_equality() {
    let desired = json!({"match": {"layer4Configs": [
        {"ipProtocol": "udp", "ports": ["53"]},
        {"ipProtocol": "tcp", "ports": ["443", "80"]},
    ]}});
    let actual = json!({"match": {"layer4Configs": [
        {"ipProtocol": "tcp", "ports": ["80-80", "443-443"]},
        {"ipProtocol": "udp", "ports": ["53-53"]},
    ]}});
    assert!(diff(&firewall_match(), &desired, &actual).unwrap().is_empty());
}

#[test]
fn set_difference_is_reported_on_the_set_path() {
    let desired = json!({"match": {"layer4Configs": [{"ipProtocol": "tcp", "ports": ["22"]}]}});
    let actual = json!({"match": {"layer4Configs": [{"ipProtocol": "tcp", "ports": ["80"]}]}});

    let diffs = diff(&firewall_match(), &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "match.layer4Configs");
    assert_eq!(diffs[0].operations(), ["patchRule".to_string()]);
}

#[test]
fn object_lists_compare_pairwise_with_indexed_paths() {
    let version = Schema::new(vec![
        FieldDescriptor::string("name"),
        FieldDescriptor::integer("targetSize"),
    ]);
    let schema = Schema::new(vec![
        FieldDescriptor::list("versions", FieldKind::Object(version)).triggers(&["patch"]),
    ]);
    let desired = json!({"versions": [
        {"name": "a", "targetSize": 1},
        {"name": "b", "targetSize": 3},
    ]});
    let actual = json!({"versions": [
        {"name": "a", "targetSize": 1},
        {"name": "b", "targetSize": 2},
    ]});

    let diffs = diff(&schema, &desired, &actual).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].field_name, "versions[1].targetSize");
}

#[test]
fn custom_equality_replaces_structural_comparison() {
    fn same_case_insensitive(a: &serde_json::Value, b: &serde_json::Value) -> bool {
        match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => a == b,
        }
    }
    let schema = Schema::new(vec![
        FieldDescriptor::string("tier")
            .equality(Equality::Custom(same_case_insensitive))
            .recreate(),
    ]);
    let actual = json!({"tier": "PREMIUM"});
    assert!(diff(&schema, &json!({"tier": "premium"}), &actual).unwrap().is_empty());
    assert_eq!(diff(&schema, &json!({"tier": "standard"}), &actual).unwrap().len(), 1);
}
