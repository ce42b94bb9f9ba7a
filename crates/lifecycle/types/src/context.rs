//! The context contract shared by every lifecycle

use crate::{EntityKind, WorkflowResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Data attached to a workflow instance, distinct from its state.
///
/// Contexts are plain values: the interpreter clones them, runs actions
/// against the clone and diffs the serialized forms to describe changes.
pub trait WorkflowContext:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The entity kind this context belongs to
    const KIND: EntityKind;

    /// JSON view of the context, used for audit snapshots and deltas
    fn snapshot(&self) -> WorkflowResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
