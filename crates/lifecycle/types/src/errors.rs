//! Error types for the lifecycle layer

use crate::{ActionName, EntityKind, EventName, GuardName, StateId};

/// Errors that can occur while building or interpreting a lifecycle
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Event '{event}' is not defined for {kind} workflows")]
    InvalidEvent { kind: EntityKind, event: EventName },

    #[error("State '{state}' is not defined for {kind} workflows")]
    UnknownState { kind: EntityKind, state: StateId },

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Guard not registered: {0}")]
    UnknownGuard(GuardName),

    #[error("Action not registered: {0}")]
    UnknownAction(ActionName),

    #[error("Duplicate state: {0}")]
    DuplicateState(StateId),

    #[error("Duplicate guard: {0}")]
    DuplicateGuard(GuardName),

    #[error("Duplicate action: {0}")]
    DuplicateAction(ActionName),

    #[error("Duplicate context event: {0}")]
    DuplicateContextEvent(EventName),

    #[error("Context event '{0}' is also bound to a state")]
    ContextEventCollision(EventName),

    #[error("Terminal state '{0}' cannot have outgoing transitions")]
    TerminalStateHasTransitions(StateId),

    #[error("State '{0}' is unreachable from the initial state")]
    UnreachableState(StateId),

    #[error("Entity kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("Workflow validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for lifecycle operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
