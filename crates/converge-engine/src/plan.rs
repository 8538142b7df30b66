use std::fmt;

use converge_core::{plan_updates, ApplyOptions, FieldDiff, LifecycleParam, UpdatePlan};
use serde::Serialize;

use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::operation::{ApiOperation, UpdateOperation};
use crate::resource::ResourceKind;

/// What an apply will do to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp,
    Create,
    Update,
    Recreate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::Update => "update",
            Action::Recreate => "recreate",
        };
        f.write_str(s)
    }
}

/// Ordered operations for one resource, plus the diffs that motivated them.
#[derive(Debug, Clone)]
pub struct ApplyPlan {
    pub addr: ResourceAddr,
    pub action: Action,
    pub operations: Vec<ApiOperation>,
    pub diffs: Vec<FieldDiff>,
}

impl ApplyPlan {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(ApiOperation::name).collect()
    }
}

/// Turn diffs into operations, enforcing lifecycle policy.
///
/// Every refusal is [`EngineError::ApplyInfeasible`] and happens before any
/// request is sent.
pub fn build_plan(
    kind: &dyn ResourceKind,
    addr: ResourceAddr,
    exists: bool,
    diffs: Vec<FieldDiff>,
    options: &ApplyOptions,
) -> Result<ApplyPlan, EngineError> {
    if !exists {
        if options.has(LifecycleParam::BlockCreation) {
            return Err(EngineError::ApplyInfeasible(format!(
                "{addr} does not exist and creation is blocked"
            )));
        }
        return Ok(ApplyPlan {
            addr,
            action: Action::Create,
            operations: vec![ApiOperation::create()],
            diffs,
        });
    }

    if options.has(LifecycleParam::BlockAcquire) {
        return Err(EngineError::ApplyInfeasible(format!(
            "{addr} already exists and acquiring it is blocked"
        )));
    }

    match plan_updates(&diffs, &kind.operation_names())? {
        UpdatePlan::InPlace { groups } if groups.is_empty() => Ok(ApplyPlan {
            addr,
            action: Action::NoOp,
            operations: Vec::new(),
            diffs,
        }),
        UpdatePlan::InPlace { groups } => {
            if options.has(LifecycleParam::BlockModification) {
                return Err(EngineError::ApplyInfeasible(format!(
                    "{addr} needs an update and modification is blocked"
                )));
            }
            let mut operations = Vec::with_capacity(groups.len());
            for group in groups {
                let spec = kind
                    .update_spec(&group.operation)
                    .copied()
                    .ok_or_else(|| {
                        converge_core::CoreError::UnknownOperation(group.operation.clone())
                    })?;
                operations.push(ApiOperation::Update(UpdateOperation {
                    spec,
                    field_diffs: group.field_diffs,
                }));
            }
            Ok(ApplyPlan {
                addr,
                action: Action::Update,
                operations,
                diffs,
            })
        }
        UpdatePlan::Recreate { fields } => {
            let fields = fields.join(", ");
            if !options.has(LifecycleParam::AllowRecreate) {
                return Err(EngineError::ApplyInfeasible(format!(
                    "{addr} cannot be updated in place ({fields}) and recreation is not allowed"
                )));
            }
            if options.has(LifecycleParam::BlockDestruction)
                || options.has(LifecycleParam::BlockCreation)
            {
                return Err(EngineError::ApplyInfeasible(format!(
                    "{addr} needs recreation ({fields}) but destruction or creation is blocked"
                )));
            }
            Ok(ApplyPlan {
                addr,
                action: Action::Recreate,
                operations: vec![ApiOperation::delete(), ApiOperation::create()],
                diffs,
            })
        }
    }
}
