//! Workflow definitions: a validated table bound to its registries
//!
//! A definition is immutable once built. Construction validates the
//! table structure and resolves every guard and action name, so the
//! interpreter never meets a dangling reference at dispatch time.

use crate::action_registry::ActionRegistry;
use crate::guard_registry::GuardRegistry;
use crate::introspection::Introspector;
use lifecycle_types::{
    EntityId, EntityKind, EventName, StateId, StateSpec, WorkflowContext, WorkflowError,
    WorkflowInstance, WorkflowResult, WorkflowTable,
};

/// A lifecycle definition for one context type
#[derive(Clone, Debug)]
pub struct WorkflowDefinition<C: WorkflowContext> {
    table: WorkflowTable,
    guards: GuardRegistry<C>,
    actions: ActionRegistry<C>,
}

impl<C: WorkflowContext> WorkflowDefinition<C> {
    /// Validate `table` and bind it to the registries
    pub fn new(
        table: WorkflowTable,
        guards: GuardRegistry<C>,
        actions: ActionRegistry<C>,
    ) -> WorkflowResult<Self> {
        if table.kind != C::KIND {
            return Err(WorkflowError::KindMismatch {
                expected: C::KIND,
                actual: table.kind,
            });
        }

        table.validate()?;

        for guard in table.referenced_guards() {
            if !guards.contains(guard) {
                return Err(WorkflowError::UnknownGuard(guard.clone()));
            }
        }
        for action in table.referenced_actions() {
            if !actions.contains(action) {
                return Err(WorkflowError::UnknownAction(action.clone()));
            }
        }

        tracing::debug!(
            kind = %table.kind,
            name = %table.name,
            version = table.version,
            states = table.states.len(),
            "Workflow definition validated"
        );

        Ok(Self {
            table,
            guards,
            actions,
        })
    }

    pub fn table(&self) -> &WorkflowTable {
        &self.table
    }

    pub fn kind(&self) -> EntityKind {
        self.table.kind
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }

    pub fn initial_state(&self) -> &StateId {
        &self.table.initial
    }

    pub fn guards(&self) -> &GuardRegistry<C> {
        &self.guards
    }

    pub fn actions(&self) -> &ActionRegistry<C> {
        &self.actions
    }

    /// Create an instance for a new entity, in the initial state
    pub fn instantiate(&self, entity_id: EntityId, context: C) -> WorkflowInstance<C> {
        WorkflowInstance::new(entity_id, self.kind(), self.table.initial.clone(), context)
    }

    /// Fail loudly on an event name this kind does not know
    pub fn ensure_event(&self, event: &EventName) -> WorkflowResult<()> {
        if self.table.recognizes(event) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidEvent {
                kind: self.kind(),
                event: event.clone(),
            })
        }
    }

    /// Look up a state, failing on names outside the state set
    pub fn ensure_state(&self, state: &StateId) -> WorkflowResult<&StateSpec> {
        self.table
            .get_state(state)
            .ok_or_else(|| WorkflowError::UnknownState {
                kind: self.kind(),
                state: state.clone(),
            })
    }

    pub fn is_terminal(&self, state: &StateId) -> bool {
        self.table.is_terminal(state)
    }

    /// Introspection over this definition
    pub fn introspect(&self) -> Introspector<'_, C> {
        Introspector::new(self)
    }

    /// Events that would currently succeed from `state`
    pub fn allowed_actions(&self, state: &StateId, context: &C) -> WorkflowResult<Vec<EventName>> {
        self.introspect().allowed_actions(state, context)
    }

    /// Why `action` is currently blocked, if it is
    pub fn blocked_reason(&self, action: &EventName, context: &C) -> WorkflowResult<Option<String>> {
        self.introspect().blocked_reason(action, context)
    }
}
