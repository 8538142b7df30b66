use converge_core::{plan_updates, CoreError, FieldDiff, Remedy, UpdatePlan};
use serde_json::json;

fn diff_for(field: &str, remedy: Remedy) -> FieldDiff {
    FieldDiff {
        field_name: field.to_string(),
        desired: json!("d"),
        actual: json!("a"),
        remedy,
    }
}

fn ops(names: &[&str]) -> Remedy {
    Remedy::Operations(names.iter().map(|n| n.to_string()).collect())
}

const KNOWN: &[&str] = &["update", "setLabels", "setTarget"];

#[test]
fn no_diffs_is_a_noop() {
    let plan = plan_updates(&[], KNOWN).unwrap();
    assert!(plan.is_noop());
}

#[test]
fn diffs_group_by_operation_in_first_appearance_order() {
    let diffs = vec![
        diff_for("labels", ops(&["setLabels"])),
        diff_for("mtu", ops(&["update"])),
        diff_for("labels.env", ops(&["setLabels"])),
    ];
    let UpdatePlan::InPlace { groups } = plan_updates(&diffs, KNOWN).unwrap() else {
        panic!("expected in-place plan");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].operation, "setLabels");
    assert_eq!(groups[0].field_diffs.len(), 2);
    assert_eq!(groups[1].operation, "update");
    assert_eq!(groups[1].field_diffs[0].field_name, "mtu");
}

#[test]
fn one_diff_can_fan_out_to_several_operations() {
    let diffs = vec![diff_for("target", ops(&["setTarget", "update"]))];
    let UpdatePlan::InPlace { groups } = plan_updates(&diffs, KNOWN).unwrap() else {
        panic!("expected in-place plan");
    };
    let names: Vec<&str> = groups.iter().map(|g| g.operation.as_str()).collect();
    assert_eq!(names, ["setTarget", "update"]);
}

#[test]
fn any_recreate_diff_makes_the_whole_plan_a_recreate() {
    let diffs = vec![
        diff_for("mtu", ops(&["update"])),
        diff_for("name", Remedy::Recreate),
    ];
    let plan = plan_updates(&diffs, KNOWN).unwrap();
    assert_eq!(
        plan,
        UpdatePlan::Recreate {
            fields: vec!["name".to_string()]
        }
    );
}

#[test]
fn unknown_operation_is_fatal() {
    let diffs = vec![diff_for("mtu", ops(&["resize"]))];
    let err = plan_updates(&diffs, KNOWN).unwrap_err();
    assert!(matches!(err, CoreError::UnknownOperation(op) if op == "resize"));
}

#[test]
fn untagged_diff_is_fatal() {
    let diffs = vec![diff_for("color", Remedy::Unspecified)];
    let err = plan_updates(&diffs, KNOWN).unwrap_err();
    assert!(matches!(err, CoreError::UntaggedDiff { field } if field == "color"));
}
