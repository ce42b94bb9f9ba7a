//! Lifecycle Domain Types
//!
//! Lifecycles are guarded finite-state workflows attached to business
//! entities. A deliverable moves from work to review to delivery; a
//! project moves from pending to active to archived. Every move is
//! declared in a table and gated by named guards.
//!
//! # Key Concepts
//!
//! - **WorkflowTable**: the declarative table for one entity kind:
//!   states, the events each state accepts, ordered candidate
//!   transitions and the context-only events valid in any state.
//! - **TransitionCandidate**: one possible reaction to an event: guard
//!   names that must all pass, an optional target state and the action
//!   names that transform the context.
//! - **WorkflowInstance**: the current state and context of one entity.
//! - **Event**: a named occurrence with an optional opaque payload.
//! - **Effect**: a description of what a dispatch changed. Effects are
//!   data; the host decides where they go.
//! - **TransitionRecord**: the append-only audit entry for a dispatch.
//!
//! # Design Principles
//!
//! 1. Tables are data. Guards and actions are referenced by name and
//!    resolved by the engine against registries.
//! 2. Context-only events are a separate category and can never move an
//!    instance to another state.
//! 3. Terminal states have no outgoing transitions.

#![deny(unsafe_code)]

mod context;
mod definition;
mod errors;
mod event;
mod instance;
mod record;

pub use context::*;
pub use definition::*;
pub use errors::*;
pub use event::*;
pub use instance::*;
pub use record::*;
