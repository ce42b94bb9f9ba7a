//! Project lifecycle
//!
//! ```text
//!  pending ──START_PROJECT──▶ active ──COMPLETE_PROJECT──▶ completed ──ARCHIVE_PROJECT──▶ archived
//!                             │    ▲
//!                  PUT_ON_HOLD│    │RESUME_PROJECT
//!                             ▼    │
//!                             onHold
//! ```
//!
//! Contract signing and payments only record facts in the context. They
//! can arrive in any order; the gated transitions fire once both of
//! their preconditions hold.

use lifecycle_engine::{Action, ActionRegistry, Guard, GuardRegistry, WorkflowDefinition};
use lifecycle_types::{
    EntityKind, Event, StateSpec, TransitionCandidate, WorkflowContext, WorkflowResult,
    WorkflowTable,
};
use serde::{Deserialize, Serialize};

pub mod states {
    pub const PENDING: &str = "pending";
    pub const ACTIVE: &str = "active";
    pub const ON_HOLD: &str = "onHold";
    pub const COMPLETED: &str = "completed";
    pub const ARCHIVED: &str = "archived";
}

pub mod events {
    pub const SIGN_CONTRACT: &str = "SIGN_CONTRACT";
    pub const RECEIVE_INITIAL_PAYMENT: &str = "RECEIVE_INITIAL_PAYMENT";
    pub const START_PROJECT: &str = "START_PROJECT";
    pub const PUT_ON_HOLD: &str = "PUT_ON_HOLD";
    pub const RESUME_PROJECT: &str = "RESUME_PROJECT";
    pub const ALL_DELIVERABLES_COMPLETE: &str = "ALL_DELIVERABLES_COMPLETE";
    pub const RECEIVE_FINAL_PAYMENT: &str = "RECEIVE_FINAL_PAYMENT";
    pub const COMPLETE_PROJECT: &str = "COMPLETE_PROJECT";
    pub const ARCHIVE_PROJECT: &str = "ARCHIVE_PROJECT";
}

pub mod guards {
    pub const CONTRACT_SIGNED: &str = "contractSigned";
    pub const INITIAL_PAYMENT_RECEIVED: &str = "initialPaymentReceived";
    pub const ALL_DELIVERABLES_DONE: &str = "allDeliverablesDone";
    pub const FINAL_PAYMENT_RECEIVED: &str = "finalPaymentReceived";
}

pub mod actions {
    pub const SIGN_CONTRACT: &str = "signContract";
    pub const RECORD_INITIAL_PAYMENT: &str = "recordInitialPayment";
    pub const MARK_DELIVERABLES_DONE: &str = "markDeliverablesDone";
    pub const RECORD_FINAL_PAYMENT: &str = "recordFinalPayment";
}

/// Context of a client project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectContext {
    pub contract_signed: bool,
    pub initial_payment_received: bool,
    pub all_deliverables_done: bool,
    pub final_payment_received: bool,
}

impl ProjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both preconditions for starting work hold
    pub fn ready_to_start(&self) -> bool {
        self.contract_signed && self.initial_payment_received
    }

    /// Both preconditions for closing the project hold
    pub fn ready_to_complete(&self) -> bool {
        self.all_deliverables_done && self.final_payment_received
    }
}

impl WorkflowContext for ProjectContext {
    const KIND: EntityKind = EntityKind::Project;
}

pub fn guard_registry() -> WorkflowResult<GuardRegistry<ProjectContext>> {
    GuardRegistry::new()
        .with(Guard::new(
            guards::CONTRACT_SIGNED,
            |ctx: &ProjectContext, _: &Event| ctx.contract_signed,
            |_| "Contract has not been signed".into(),
        ))?
        .with(Guard::new(
            guards::INITIAL_PAYMENT_RECEIVED,
            |ctx: &ProjectContext, _: &Event| ctx.initial_payment_received,
            |_| "Initial payment has not been received".into(),
        ))?
        .with(Guard::new(
            guards::ALL_DELIVERABLES_DONE,
            |ctx: &ProjectContext, _: &Event| ctx.all_deliverables_done,
            |_| "Not all deliverables are complete".into(),
        ))?
        .with(Guard::new(
            guards::FINAL_PAYMENT_RECEIVED,
            |ctx: &ProjectContext, _: &Event| ctx.final_payment_received,
            |_| "Final payment has not been received".into(),
        ))
}

pub fn action_registry() -> WorkflowResult<ActionRegistry<ProjectContext>> {
    ActionRegistry::new()
        .with(Action::new(actions::SIGN_CONTRACT, |ctx: &mut ProjectContext, _| {
            ctx.contract_signed = true
        }))?
        .with(Action::new(actions::RECORD_INITIAL_PAYMENT, |ctx: &mut ProjectContext, _| {
            ctx.initial_payment_received = true
        }))?
        .with(Action::new(actions::MARK_DELIVERABLES_DONE, |ctx: &mut ProjectContext, _| {
            ctx.all_deliverables_done = true
        }))?
        .with(Action::new(actions::RECORD_FINAL_PAYMENT, |ctx: &mut ProjectContext, _| {
            ctx.final_payment_received = true
        }))
}

/// The declarative project table
pub fn table() -> WorkflowResult<WorkflowTable> {
    use self::{actions as a, events as e, guards as g, states as s};

    let mut table = WorkflowTable::new(EntityKind::Project, "Project", s::PENDING);

    table.add_state(StateSpec::new(s::PENDING).with_description("Waiting on contract and deposit"))?;
    table.add_state(StateSpec::new(s::ACTIVE).with_description("Work is under way"))?;
    table.add_state(StateSpec::new(s::ON_HOLD).with_description("Paused"))?;
    table.add_state(StateSpec::new(s::COMPLETED).with_description("Work done and paid for"))?;
    table.add_state(StateSpec::terminal(s::ARCHIVED).with_description("Closed for history"))?;

    table.on(
        s::PENDING,
        e::SIGN_CONTRACT,
        TransitionCandidate::internal().with_action(a::SIGN_CONTRACT),
    )?;
    table.on(
        s::PENDING,
        e::RECEIVE_INITIAL_PAYMENT,
        TransitionCandidate::internal().with_action(a::RECORD_INITIAL_PAYMENT),
    )?;
    table.on(
        s::PENDING,
        e::START_PROJECT,
        TransitionCandidate::to(s::ACTIVE)
            .guarded(g::CONTRACT_SIGNED)
            .guarded(g::INITIAL_PAYMENT_RECEIVED),
    )?;

    table.on(s::ACTIVE, e::PUT_ON_HOLD, TransitionCandidate::to(s::ON_HOLD))?;
    table.on(
        s::ACTIVE,
        e::ALL_DELIVERABLES_COMPLETE,
        TransitionCandidate::internal().with_action(a::MARK_DELIVERABLES_DONE),
    )?;
    table.on(
        s::ACTIVE,
        e::RECEIVE_FINAL_PAYMENT,
        TransitionCandidate::internal().with_action(a::RECORD_FINAL_PAYMENT),
    )?;
    table.on(
        s::ACTIVE,
        e::COMPLETE_PROJECT,
        TransitionCandidate::to(s::COMPLETED)
            .guarded(g::ALL_DELIVERABLES_DONE)
            .guarded(g::FINAL_PAYMENT_RECEIVED),
    )?;

    table.on(s::ON_HOLD, e::RESUME_PROJECT, TransitionCandidate::to(s::ACTIVE))?;
    table.on(s::COMPLETED, e::ARCHIVE_PROJECT, TransitionCandidate::to(s::ARCHIVED))?;

    Ok(table)
}

/// The validated project definition
pub fn definition() -> WorkflowResult<WorkflowDefinition<ProjectContext>> {
    WorkflowDefinition::new(table()?, guard_registry()?, action_registry()?)
}
