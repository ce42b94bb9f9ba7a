//! Workflow instances: the lifecycle position of one entity
//!
//! An instance holds exactly one current state and the context. It is
//! only ever replaced by the interpreter's output, never edited in place
//! by callers.

use crate::{EntityKind, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Entity Identifier ────────────────────────────────────────────────

/// Identifier of the business entity a lifecycle is attached to
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// First eight characters, for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Workflow Instance ────────────────────────────────────────────────

/// The current lifecycle position of an entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance<C> {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    /// Current state, always a member of the table's state set
    pub state: StateId,
    pub context: C,
    pub created_at: DateTime<Utc>,
    /// When the last state or context change happened
    pub updated_at: DateTime<Utc>,
}

impl<C> WorkflowInstance<C> {
    pub fn new(entity_id: EntityId, kind: EntityKind, state: StateId, context: C) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            kind,
            state,
            context,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the instance is currently in `state`
    pub fn is_in(&self, state: &str) -> bool {
        self.state == state
    }
}
