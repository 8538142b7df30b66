//! converge-core
//!
//! Resource-agnostic reconciliation primitives. Pure functions over
//! `serde_json::Value` states driven by per-resource field tables; no I/O.
//!
//! - `field`: `Schema` / `FieldDescriptor` tables
//! - `canonicalize`: desired-vs-initial and new-vs-desired normalization
//! - `diff`: tagged field-level diffs
//! - `plan`: grouping diffs into named update operations

pub mod canonicalize;
pub mod diff;
pub mod error;
pub mod field;
pub mod lifecycle;
pub mod normalize;
pub mod plan;

pub use crate::canonicalize::{
    canonicalize_desired, canonicalize_new_state, fill_defaults, merge_server_fields,
};
pub use crate::diff::{diff, FieldDiff, Remedy};
pub use crate::error::CoreError;
pub use crate::field::{Equality, FieldDescriptor, FieldKind, OperationSelector, Schema};
pub use crate::lifecycle::{ApplyOptions, LifecycleParam};
pub use crate::plan::{plan_updates, OperationGroup, UpdatePlan};
