//! converge-engine
//!
//! Declarative reconciliation for compute resources: fetch the remote state,
//! diff it against the desired state, plan the smallest set of mutating
//! calls, run them, and verify convergence.
//!
//! Public API:
//! - `get()`: fetch one resource, canonicalized against the request
//! - `list()`: one page of resources under a parent, with `ResourceList::next()`
//! - `plan()`: the operations an apply would run, without running them
//! - `apply()`: converge one resource, retrying the whole apply on 409
//! - `delete()`: delete one resource, tolerating not-found
//! - `delete_all()`: delete every listed resource a filter accepts

pub mod addr;
pub mod apply;
pub mod compute;
pub mod destroy;
pub mod error;
pub mod operation;
pub mod plan;
pub mod read;
pub mod resource;
mod scope;

pub use crate::addr::ResourceAddr;
pub use crate::apply::{apply, plan, ApplyOutcome, ApplyPhase};
pub use crate::compute::kind_for;
pub use crate::destroy::{delete, delete_all};
pub use crate::error::EngineError;
pub use crate::operation::ApiOperation;
pub use crate::plan::{build_plan, Action, ApplyPlan};
pub use crate::read::{get, list, ResourceList};
pub use crate::resource::{Endpoint, ResourceKind, UpdateSpec};
