//! Effects and audit records
//!
//! The interpreter never performs I/O. It describes what a dispatch
//! changed as a list of effects, and the host routes them to a store,
//! an audit log or a queue. A `TransitionRecord` is the append-only
//! audit form of one successful dispatch.

use crate::{EntityId, EntityKind, Event, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One context field that changed during a dispatch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Compare two serialized contexts field by field.
///
/// Fields are reported in key order. Non-object values are compared as
/// a whole under the empty field name.
pub fn diff_fields(before: &Value, after: &Value) -> Vec<FieldChange> {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter()
                .filter_map(|key| {
                    let old = b.get(key).cloned().unwrap_or(Value::Null);
                    let new = a.get(key).cloned().unwrap_or(Value::Null);
                    (old != new).then(|| FieldChange {
                        field: key.clone(),
                        before: old,
                        after: new,
                    })
                })
                .collect()
        }
        _ if before != after => vec![FieldChange {
            field: String::new(),
            before: before.clone(),
            after: after.clone(),
        }],
        _ => Vec::new(),
    }
}

/// Audit data produced by the interpreter, before the host stamps the entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub from_state: StateId,
    pub to_state: StateId,
    pub event: Event,
    /// Full context after the dispatch
    pub context_after: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    pub timestamp: DateTime<Utc>,
}

/// A side effect described by the interpreter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// The instance moved to another state
    StateChanged { from: StateId, to: StateId },
    /// Context fields changed
    ContextChanged { changes: Vec<FieldChange> },
    /// An audit record should be written
    Audit(AuditEntry),
}

// ── Transition Record ────────────────────────────────────────────────

/// Append-only audit record of one successful dispatch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub from_state: StateId,
    pub to_state: StateId,
    pub event: Event,
    pub context_after: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn from_entry(entity_id: EntityId, kind: EntityKind, entry: AuditEntry) -> Self {
        Self {
            entity_id,
            kind,
            from_state: entry.from_state,
            to_state: entry.to_state,
            event: entry.event,
            context_after: entry.context_after,
            changes: entry.changes,
            timestamp: entry.timestamp,
        }
    }

    /// Check if the dispatch moved the instance to another state
    pub fn is_state_change(&self) -> bool {
        self.from_state != self.to_state
    }

    /// Check if this record touches a specific state
    pub fn involves_state(&self, state: &StateId) -> bool {
        &self.from_state == state || &self.to_state == state
    }
}

impl std::fmt::Display for TransitionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_state_change() {
            write!(
                f,
                "{} {}: {} -> {} ({})",
                self.kind, self.entity_id, self.from_state, self.to_state, self.event
            )
        } else {
            write!(
                f,
                "{} {}: {} context updated ({})",
                self.kind, self.entity_id, self.from_state, self.event
            )
        }
    }
}
