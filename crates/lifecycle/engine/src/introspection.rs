//! Introspection: which actions are legal now, and why others are not
//!
//! Introspection reads the same table and guard registry the interpreter
//! uses, so "allowed" here means exactly "a candidate would fire" there.

use crate::definition::WorkflowDefinition;
use crate::guard_registry::{GuardEvaluator, GuardResult};
use lifecycle_types::{
    Event, EventBinding, EventName, GuardName, StateId, WorkflowContext, WorkflowResult,
};
use serde::{Deserialize, Serialize};

/// A statically declared edge out of a state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTransition {
    pub event: EventName,
    pub target: StateId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<GuardName>,
}

/// Read-only queries over a definition
#[derive(Clone, Debug)]
pub struct Introspector<'a, C: WorkflowContext> {
    definition: &'a WorkflowDefinition<C>,
    evaluator: GuardEvaluator,
}

impl<'a, C: WorkflowContext> Introspector<'a, C> {
    pub fn new(definition: &'a WorkflowDefinition<C>) -> Self {
        Self {
            definition,
            evaluator: GuardEvaluator::new(),
        }
    }

    /// State-bound events that would currently fire from `state`, in
    /// declaration order. Context-only events are reported separately by
    /// [`allowed_context_events`](Self::allowed_context_events).
    pub fn allowed_actions(&self, state: &StateId, context: &C) -> WorkflowResult<Vec<EventName>> {
        let spec = self.definition.ensure_state(state)?;
        let mut allowed = Vec::new();
        for binding in &spec.bindings {
            if self.binding_fires(binding, context)?.is_satisfied() {
                allowed.push(binding.event.clone());
            }
        }
        Ok(allowed)
    }

    /// Context-only events whose guards currently pass
    pub fn allowed_context_events(&self, context: &C) -> WorkflowResult<Vec<EventName>> {
        let mut allowed = Vec::new();
        for global in &self.definition.table().context_events {
            let probe = Event::new(global.event.as_str());
            if self
                .evaluator
                .evaluate(self.definition.guards(), &global.guards, context, &probe)?
                .is_satisfied()
            {
                allowed.push(global.event.clone());
            }
        }
        Ok(allowed)
    }

    /// Check if `action` would currently fire from `state`
    pub fn is_action_allowed(
        &self,
        state: &StateId,
        action: &EventName,
        context: &C,
    ) -> WorkflowResult<bool> {
        Ok(self.blocked_reason_in(state, action, context)?.is_none())
    }

    /// Why `action` is blocked by its guards, independent of state.
    ///
    /// Every state that binds `action` is checked in declaration order;
    /// the explanation of the first binding with no passing candidate is
    /// returned. `None` means no guard currently stands in the way.
    pub fn blocked_reason(&self, action: &EventName, context: &C) -> WorkflowResult<Option<String>> {
        self.definition.ensure_event(action)?;

        if let Some(global) = self.definition.table().context_event(action) {
            let probe = Event::new(action.as_str());
            let result =
                self.evaluator
                    .evaluate(self.definition.guards(), &global.guards, context, &probe)?;
            return Ok(result.summary());
        }

        for spec in self.definition.table().states_accepting(action) {
            let Some(binding) = spec.binding(action) else {
                continue;
            };
            if let Some(reason) = self.binding_fires(binding, context)?.summary() {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    /// Why `action` cannot fire from `state`, including the case where
    /// the state does not accept it at all
    pub fn blocked_reason_in(
        &self,
        state: &StateId,
        action: &EventName,
        context: &C,
    ) -> WorkflowResult<Option<String>> {
        let spec = self.definition.ensure_state(state)?;
        self.definition.ensure_event(action)?;

        if let Some(global) = self.definition.table().context_event(action) {
            let probe = Event::new(action.as_str());
            let result =
                self.evaluator
                    .evaluate(self.definition.guards(), &global.guards, context, &probe)?;
            return Ok(result.summary());
        }

        match spec.binding(action) {
            Some(binding) => Ok(self.binding_fires(binding, context)?.summary()),
            None if spec.terminal => Ok(Some(format!(
                "'{}' is a terminal state and accepts no further actions",
                state
            ))),
            None => Ok(Some(format!(
                "{} is not available in state '{}'",
                action, state
            ))),
        }
    }

    /// Declared edges out of `state`, ignoring guards
    pub fn outgoing_transitions(&self, state: &StateId) -> WorkflowResult<Vec<OutgoingTransition>> {
        let spec = self.definition.ensure_state(state)?;
        Ok(spec
            .bindings
            .iter()
            .flat_map(|binding| {
                binding.candidates.iter().filter_map(move |candidate| {
                    candidate.target.as_ref().map(|target| OutgoingTransition {
                        event: binding.event.clone(),
                        target: target.clone(),
                        guards: candidate.guards.clone(),
                    })
                })
            })
            .collect())
    }

    // ── Internal helpers ─────────────────────────────────────────────

    /// Satisfied if some candidate's guards all pass; otherwise the
    /// failures of the last candidate tried
    fn binding_fires(&self, binding: &EventBinding, context: &C) -> WorkflowResult<GuardResult> {
        let probe = Event::new(binding.event.as_str());
        let mut last = GuardResult::Satisfied;
        for candidate in &binding.candidates {
            last = self.evaluator.evaluate(
                self.definition.guards(),
                &candidate.guards,
                context,
                &probe,
            )?;
            if last.is_satisfied() {
                return Ok(last);
            }
        }
        Ok(last)
    }
}
