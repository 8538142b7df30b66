use std::fmt;

use converge_client::Client;
use converge_core::{
    canonicalize_desired, canonicalize_new_state, diff, merge_server_fields, ApplyOptions,
    FieldDiff,
};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::addr::ResourceAddr;
use crate::error::EngineError;
use crate::operation::ApiOperation;
use crate::plan::{build_plan, Action, ApplyPlan};
use crate::read::fetch_raw;
use crate::resource::{flatten, ResourceKind};
use crate::scope::{call_client, with_deadline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPhase {
    Validating,
    Diffing,
    PlanningInfeasibilityCheck,
    Actuating,
    Reconciling,
    Converged,
    Failed,
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplyPhase::Validating => "validating",
            ApplyPhase::Diffing => "diffing",
            ApplyPhase::PlanningInfeasibilityCheck => "planning",
            ApplyPhase::Actuating => "actuating",
            ApplyPhase::Reconciling => "reconciling",
            ApplyPhase::Converged => "converged",
            ApplyPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of a converged apply.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// Post-apply state, canonicalized against the desired state.
    pub state: Value,
    pub action: Action,
    /// Names of the operations that were sent, in order.
    pub executed: Vec<String>,
    /// Diffs found before actuating.
    pub diffs: Vec<FieldDiff>,
}

/// Drive the remote resource to `desired`.
///
/// The whole apply is retried from the top on 409 conflicts, up to
/// `retry.max_attempts`, and the call as a whole is bounded by the
/// configured timeout.
pub async fn apply(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
) -> Result<ApplyOutcome, EngineError> {
    let client = call_client(client);
    let span = tracing::info_span!(
        "apply",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    with_deadline(&client, apply_with_conflict_retry(&client, kind, desired, options))
        .instrument(span)
        .await
}

/// Compute the plan an apply would execute, without sending any mutation.
pub async fn plan(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
) -> Result<ApplyPlan, EngineError> {
    let client = call_client(client);
    let span = tracing::info_span!(
        "plan",
        resource_type = kind.resource_type(),
        request_id = client.request_id().unwrap_or_default()
    );
    let planned = async {
        kind.validate(desired)?;
        let observed = diffs_for_raw_desired(&client, kind, desired, options).await?;
        build_plan(kind, kind.addr(desired), observed.initial.is_some(), observed.diffs, options)
    };
    with_deadline(&client, planned).instrument(span).await
}

async fn apply_with_conflict_retry(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
) -> Result<ApplyOutcome, EngineError> {
    let policy = &client.config().retry;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match apply_once(client, kind, desired, options).await {
            Err(e) if e.is_conflict() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "conflict, retrying apply"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

fn enter(addr: &ResourceAddr, phase: ApplyPhase) {
    tracing::info!(%addr, %phase, "apply phase");
}

async fn apply_once(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
) -> Result<ApplyOutcome, EngineError> {
    let addr = kind.addr(desired);
    let result = run_phases(client, kind, desired, options, &addr).await;
    match &result {
        Ok(outcome) => tracing::info!(
            %addr,
            phase = %ApplyPhase::Converged,
            action = %outcome.action,
            operations = outcome.executed.len(),
            "apply converged"
        ),
        Err(e) => tracing::warn!(%addr, phase = %ApplyPhase::Failed, error = %e, "apply failed"),
    }
    result
}

async fn run_phases(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
    addr: &ResourceAddr,
) -> Result<ApplyOutcome, EngineError> {
    let schema = kind.schema();

    enter(addr, ApplyPhase::Validating);
    kind.validate(desired)?;

    enter(addr, ApplyPhase::Diffing);
    let observed = diffs_for_raw_desired(client, kind, desired, options).await?;

    enter(addr, ApplyPhase::PlanningInfeasibilityCheck);
    let mut plan = build_plan(
        kind,
        addr.clone(),
        observed.initial.is_some(),
        observed.diffs,
        options,
    )?;
    if !plan.has_changes() {
        return Ok(ApplyOutcome {
            state: observed.initial.unwrap_or(observed.desired),
            action: plan.action,
            executed: Vec::new(),
            diffs: plan.diffs,
        });
    }
    tracing::info!(
        %addr,
        action = %plan.action,
        operations = ?plan.operation_names(),
        "applying plan"
    );

    enter(addr, ApplyPhase::Actuating);
    // Delete addresses the existing resource, which the hint may name.
    // Create starts from defaults only, never from the old resource.
    let existing = options.state_hint.as_ref().unwrap_or(desired);
    let fresh = canonicalize_desired(schema, desired, None);
    let mut executed = Vec::with_capacity(plan.operations.len());
    let mut create_response = None;
    for op in &mut plan.operations {
        let target = match &*op {
            ApiOperation::Delete(_) => existing,
            ApiOperation::Create(_) => &fresh,
            ApiOperation::Update(_) => &observed.desired,
        };
        op.execute(client, kind, target).await?;
        executed.push(op.name().to_string());
        if let ApiOperation::Create(create) = &*op {
            create_response = create.first_response().cloned();
        }
    }

    enter(addr, ApplyPhase::Reconciling);
    let mut new_raw = flatten(schema, &fetch_raw(client, kind, desired).await?);
    if let Some(response) = &create_response {
        new_raw = merge_server_fields(schema, &new_raw, response);
    }
    let new_state = canonicalize_new_state(schema, &new_raw, desired);
    let desired_canon = canonicalize_desired(schema, desired, Some(&new_state));
    let remaining = diff(schema, &desired_canon, &new_state)?;
    if !remaining.is_empty() {
        return Err(EngineError::DiffAfterApply {
            diffs: remaining,
            state: Box::new(new_state),
        });
    }

    Ok(ApplyOutcome {
        state: new_state,
        action: plan.action,
        executed,
        diffs: plan.diffs,
    })
}

/// What the diffing phase saw.
pub(crate) struct Observed {
    /// Existing state canonicalized against desired; `None` when absent.
    pub initial: Option<Value>,
    /// Desired state canonicalized against `initial`.
    pub desired: Value,
    pub diffs: Vec<FieldDiff>,
}

/// Fetch the existing resource (at the state hint if one is given) and diff
/// the canonicalized desired state against it.
pub(crate) async fn diffs_for_raw_desired(
    client: &Client,
    kind: &dyn ResourceKind,
    desired: &Value,
    options: &ApplyOptions,
) -> Result<Observed, EngineError> {
    let schema = kind.schema();
    let lookup = options.state_hint.as_ref().unwrap_or(desired);
    let raw = match fetch_raw(client, kind, lookup).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            tracing::debug!(addr = %kind.addr(lookup), "resource absent");
            return Ok(Observed {
                initial: None,
                desired: canonicalize_desired(schema, desired, None),
                diffs: Vec::new(),
            });
        }
        Err(e) => return Err(e),
    };
    let initial = canonicalize_new_state(schema, &flatten(schema, &raw), desired);
    let desired_canon = canonicalize_desired(schema, desired, Some(&initial));
    let diffs = diff(schema, &desired_canon, &initial)?;
    tracing::debug!(count = diffs.len(), "computed diffs");
    Ok(Observed {
        initial: Some(initial),
        desired: desired_canon,
        diffs,
    })
}
