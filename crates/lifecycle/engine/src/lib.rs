//! Lifecycle Engine
//!
//! Runs guarded finite-state lifecycles described by a
//! [`WorkflowTable`](lifecycle_types::WorkflowTable).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   WorkflowDefinition<C>                  │
//! │   (validated table + guard registry + action registry)   │
//! ├──────────────┬───────────────────┬───────────────────────┤
//! │ Interpreter  │   Introspector    │    GuardEvaluator     │
//! │ (transition, │ (allowed actions, │ (named predicates and │
//! │ apply,replay)│  blocked reasons) │  their explanations)  │
//! └──────────────┴───────────────────┴───────────────────────┘
//! ```
//!
//! The interpreter is pure and synchronous. It returns the next state,
//! the next context and a list of effect descriptions; persistence,
//! audit and locking belong to the host.

#![deny(unsafe_code)]

pub mod action_registry;
pub mod definition;
pub mod guard_registry;
pub mod interpreter;
pub mod introspection;

pub use action_registry::{Action, ActionFn, ActionRegistry};
pub use definition::WorkflowDefinition;
pub use guard_registry::{
    BlockedGuard, Guard, GuardEvaluator, GuardExplanation, GuardPredicate, GuardRegistry,
    GuardResult,
};
pub use interpreter::{Applied, Interpreter, NoEffect, Outcome, Replay, Transition};
pub use introspection::{Introspector, OutgoingTransition};

use lifecycle_types::{Event, StateId, WorkflowContext, WorkflowResult};

/// Compute the next state, context and effects for one event
pub fn transition<C: WorkflowContext>(
    definition: &WorkflowDefinition<C>,
    state: &StateId,
    context: &C,
    event: &Event,
) -> WorkflowResult<Transition<C>> {
    Interpreter::new().transition(definition, state, context, event)
}
