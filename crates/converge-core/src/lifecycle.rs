use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller policy consulted before any mutating request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleParam {
    /// Fail instead of creating a missing resource.
    BlockCreation,
    /// Fail instead of taking over a resource that already exists.
    BlockAcquire,
    /// Fail instead of updating an existing resource in place.
    BlockModification,
    /// Fail instead of deleting, including the delete half of a recreate.
    BlockDestruction,
    /// Permit delete-then-create when a diff cannot be applied in place.
    AllowRecreate,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub lifecycle: Vec<LifecycleParam>,
    /// Identifies the existing resource to diff against when it differs
    /// from the desired identity (e.g. a rename under `AllowRecreate`).
    pub state_hint: Option<Value>,
}

impl ApplyOptions {
    pub fn has(&self, param: LifecycleParam) -> bool {
        self.lifecycle.contains(&param)
    }

    pub fn with_lifecycle(mut self, param: LifecycleParam) -> Self {
        if !self.has(param) {
            self.lifecycle.push(param);
        }
        self
    }

    pub fn with_state_hint(mut self, hint: Value) -> Self {
        self.state_hint = Some(hint);
        self
    }
}
