use serde::Serialize;

use crate::diff::{FieldDiff, Remedy};
use crate::error::CoreError;

/// The diffs one named update operation is responsible for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationGroup {
    pub operation: String,
    pub field_diffs: Vec<FieldDiff>,
}

/// Outcome of converting field diffs into update work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdatePlan {
    /// Groups in first-appearance order; empty means nothing to do.
    InPlace { groups: Vec<OperationGroup> },
    /// At least one diff cannot be applied in place.
    Recreate { fields: Vec<String> },
}

impl UpdatePlan {
    pub fn is_noop(&self) -> bool {
        matches!(self, UpdatePlan::InPlace { groups } if groups.is_empty())
    }
}

/// Group diffs by the operation that reconciles them.
///
/// A diff that names several operations joins each of their groups. Any
/// recreate diff turns the whole plan into [`UpdatePlan::Recreate`]; an
/// update plan never silently drops one. Untagged diffs and operation names
/// outside `known_operations` are schema errors.
pub fn plan_updates(
    diffs: &[FieldDiff],
    known_operations: &[&str],
) -> Result<UpdatePlan, CoreError> {
    let mut groups: Vec<OperationGroup> = Vec::new();
    let mut recreate_fields = Vec::new();

    for fd in diffs {
        match &fd.remedy {
            Remedy::Unspecified => {
                return Err(CoreError::UntaggedDiff {
                    field: fd.field_name.clone(),
                });
            }
            Remedy::Recreate => recreate_fields.push(fd.field_name.clone()),
            Remedy::Operations(ops) => {
                for op in ops {
                    if !known_operations.iter().any(|known| *known == op.as_str()) {
                        return Err(CoreError::UnknownOperation(op.clone()));
                    }
                    match groups.iter_mut().find(|g| &g.operation == op) {
                        Some(group) => group.field_diffs.push(fd.clone()),
                        None => groups.push(OperationGroup {
                            operation: op.clone(),
                            field_diffs: vec![fd.clone()],
                        }),
                    }
                }
            }
        }
    }

    if recreate_fields.is_empty() {
        Ok(UpdatePlan::InPlace { groups })
    } else {
        Ok(UpdatePlan::Recreate {
            fields: recreate_fields,
        })
    }
}
