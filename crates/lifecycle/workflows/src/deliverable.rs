//! Deliverable lifecycle
//!
//! ```text
//!  inProgress ──SUBMIT_FOR_REVIEW──▶ inReview ──APPROVE──▶ approved ──DELIVER──▶ delivered
//!      ▲                                │                     ▲
//!      ├──────REQUEST_REVISION──────────┤                     │
//!      │                                ▼                     │
//!      └─APPROVE_ADDITIONAL_SCOPE── revisionLimitMet ──APPROVE─┘
//! ```
//!
//! Revisions are bounded by `maxRevisions`. The request that uses the
//! last allowed revision routes to `revisionLimitMet`, and further work
//! needs an explicit scope approval, which resets the count.
//!
//! Payment events are context-only and accepted in every state. Revoking
//! payment never moves a delivered deliverable back.

use lifecycle_engine::{Action, ActionRegistry, Guard, GuardRegistry, WorkflowDefinition};
use lifecycle_types::{
    ContextEventSpec, EntityKind, Event, StateSpec, TransitionCandidate, WorkflowContext,
    WorkflowResult, WorkflowTable,
};
use serde::{Deserialize, Serialize};

/// Revisions allowed when a deliverable does not configure its own limit
pub const DEFAULT_MAX_REVISIONS: u32 = 2;

pub mod states {
    pub const IN_PROGRESS: &str = "inProgress";
    pub const IN_REVIEW: &str = "inReview";
    pub const APPROVED: &str = "approved";
    pub const DELIVERED: &str = "delivered";
    pub const REVISION_LIMIT_MET: &str = "revisionLimitMet";
}

pub mod events {
    pub const SUBMIT_FOR_REVIEW: &str = "SUBMIT_FOR_REVIEW";
    pub const APPROVE: &str = "APPROVE";
    pub const REQUEST_REVISION: &str = "REQUEST_REVISION";
    pub const DELIVER: &str = "DELIVER";
    pub const APPROVE_ADDITIONAL_SCOPE: &str = "APPROVE_ADDITIONAL_SCOPE";
    pub const PAYMENT_RECEIVED: &str = "PAYMENT_RECEIVED";
    pub const PAYMENT_REVOKED: &str = "PAYMENT_REVOKED";
    pub const GRANT_RAW_ACCESS: &str = "GRANT_RAW_ACCESS";
}

pub mod guards {
    pub const INVOICE_PAID: &str = "invoicePaid";
    pub const REVISIONS_REMAINING: &str = "revisionsRemaining";
    pub const LAST_REVISION: &str = "lastRevision";
}

pub mod actions {
    pub const INCREMENT_REVISION: &str = "incrementRevision";
    pub const RESET_REVISIONS: &str = "resetRevisions";
    pub const MARK_INVOICE_PAID: &str = "markInvoicePaid";
    pub const MARK_INVOICE_UNPAID: &str = "markInvoiceUnpaid";
    pub const GRANT_RAW_ACCESS: &str = "grantRawAccess";
}

// ── Context ──────────────────────────────────────────────────────────

/// Context of a deliverable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliverableContext {
    pub invoice_paid: bool,
    pub revision_count: u32,
    pub max_revisions: u32,
    pub raw_access_granted: bool,
}

impl Default for DeliverableContext {
    fn default() -> Self {
        Self {
            invoice_paid: false,
            revision_count: 0,
            max_revisions: DEFAULT_MAX_REVISIONS,
            raw_access_granted: false,
        }
    }
}

impl DeliverableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_revisions(mut self, max_revisions: u32) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    /// Revisions still available before scope must be renegotiated
    pub fn revisions_remaining(&self) -> u32 {
        self.max_revisions.saturating_sub(self.revision_count)
    }
}

impl WorkflowContext for DeliverableContext {
    const KIND: EntityKind = EntityKind::Deliverable;
}

// ── Guards and actions ───────────────────────────────────────────────

fn invoice_paid(ctx: &DeliverableContext, _: &Event) -> bool {
    ctx.invoice_paid
}

fn revisions_remaining(ctx: &DeliverableContext, _: &Event) -> bool {
    ctx.revision_count < ctx.max_revisions
}

/// The next revision uses up the allowance
fn last_revision(ctx: &DeliverableContext, _: &Event) -> bool {
    ctx.revision_count.saturating_add(1) >= ctx.max_revisions
}

fn explain_revision_limit(ctx: &DeliverableContext) -> String {
    format!(
        "Revision limit reached ({} of {} revisions used); approve additional scope before requesting more",
        ctx.revision_count, ctx.max_revisions
    )
}

pub fn guard_registry() -> WorkflowResult<GuardRegistry<DeliverableContext>> {
    GuardRegistry::new()
        .with(
            Guard::new(guards::INVOICE_PAID, invoice_paid, |_| {
                "Invoice has not been paid".into()
            })
            .with_description("The client invoice is settled"),
        )?
        .with(
            Guard::new(
                guards::REVISIONS_REMAINING,
                revisions_remaining,
                explain_revision_limit,
            )
            .with_description("Fewer revisions used than the configured maximum"),
        )?
        .with(
            Guard::new(guards::LAST_REVISION, last_revision, |ctx| {
                format!(
                    "{} revisions remain after this request",
                    ctx.revisions_remaining().saturating_sub(1)
                )
            })
            .with_description("This revision reaches the configured maximum"),
        )
}

pub fn action_registry() -> WorkflowResult<ActionRegistry<DeliverableContext>> {
    ActionRegistry::new()
        .with(Action::new(actions::INCREMENT_REVISION, |ctx: &mut DeliverableContext, _| {
            ctx.revision_count = ctx.revision_count.saturating_add(1)
        }))?
        .with(Action::new(actions::RESET_REVISIONS, |ctx: &mut DeliverableContext, _| {
            ctx.revision_count = 0
        }))?
        .with(Action::new(actions::MARK_INVOICE_PAID, |ctx: &mut DeliverableContext, _| {
            ctx.invoice_paid = true
        }))?
        .with(Action::new(actions::MARK_INVOICE_UNPAID, |ctx: &mut DeliverableContext, _| {
            ctx.invoice_paid = false
        }))?
        .with(Action::new(actions::GRANT_RAW_ACCESS, |ctx: &mut DeliverableContext, _| {
            ctx.raw_access_granted = true
        }))
}

// ── Table ────────────────────────────────────────────────────────────

/// The declarative deliverable table
pub fn table() -> WorkflowResult<WorkflowTable> {
    use self::{actions as a, events as e, guards as g, states as s};

    let mut table = WorkflowTable::new(EntityKind::Deliverable, "Deliverable", s::IN_PROGRESS);

    table.add_state(StateSpec::new(s::IN_PROGRESS).with_description("Work is under way"))?;
    table.add_state(StateSpec::new(s::IN_REVIEW).with_description("Awaiting client review"))?;
    table.add_state(StateSpec::new(s::APPROVED).with_description("Accepted by the client"))?;
    table.add_state(
        StateSpec::new(s::REVISION_LIMIT_MET)
            .with_description("Revision allowance used up; scope must be renegotiated"),
    )?;
    table.add_state(StateSpec::terminal(s::DELIVERED).with_description("Handed over"))?;

    table.on(
        s::IN_PROGRESS,
        e::SUBMIT_FOR_REVIEW,
        TransitionCandidate::to(s::IN_REVIEW),
    )?;

    table.on(s::IN_REVIEW, e::APPROVE, TransitionCandidate::to(s::APPROVED))?;
    table.on(
        s::IN_REVIEW,
        e::REQUEST_REVISION,
        TransitionCandidate::to(s::REVISION_LIMIT_MET)
            .guarded(g::REVISIONS_REMAINING)
            .guarded(g::LAST_REVISION)
            .with_action(a::INCREMENT_REVISION)
            .with_label("Final revision"),
    )?;
    table.on(
        s::IN_REVIEW,
        e::REQUEST_REVISION,
        TransitionCandidate::to(s::IN_PROGRESS)
            .guarded(g::REVISIONS_REMAINING)
            .with_action(a::INCREMENT_REVISION)
            .with_label("Revision"),
    )?;

    table.on(
        s::APPROVED,
        e::DELIVER,
        TransitionCandidate::to(s::DELIVERED).guarded(g::INVOICE_PAID),
    )?;

    table.on(
        s::REVISION_LIMIT_MET,
        e::APPROVE_ADDITIONAL_SCOPE,
        TransitionCandidate::to(s::IN_PROGRESS).with_action(a::RESET_REVISIONS),
    )?;
    table.on(
        s::REVISION_LIMIT_MET,
        e::APPROVE,
        TransitionCandidate::to(s::APPROVED),
    )?;

    table.add_context_event(
        ContextEventSpec::new(e::PAYMENT_RECEIVED)
            .with_action(a::MARK_INVOICE_PAID)
            .with_description("Invoice settled"),
    )?;
    table.add_context_event(
        ContextEventSpec::new(e::PAYMENT_REVOKED)
            .with_action(a::MARK_INVOICE_UNPAID)
            .with_description("Payment reversed; reached states are kept"),
    )?;
    table.add_context_event(
        ContextEventSpec::new(e::GRANT_RAW_ACCESS)
            .guarded(g::INVOICE_PAID)
            .with_action(a::GRANT_RAW_ACCESS)
            .with_description("Share raw source assets with the client"),
    )?;

    Ok(table)
}

/// The validated deliverable definition
pub fn definition() -> WorkflowResult<WorkflowDefinition<DeliverableContext>> {
    WorkflowDefinition::new(table()?, guard_registry()?, action_registry()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle_types::{EventName, StateId};

    #[test]
    fn test_definition_is_valid() {
        let def = definition().unwrap();
        assert_eq!(def.initial_state(), &StateId::new(states::IN_PROGRESS));
        assert_eq!(
            def.table().terminal_states(),
            vec![&StateId::new(states::DELIVERED)]
        );
    }

    #[test]
    fn test_context_defaults() {
        let ctx = DeliverableContext::default();
        assert_eq!(ctx.max_revisions, DEFAULT_MAX_REVISIONS);
        assert_eq!(ctx.revisions_remaining(), 2);
        assert!(!ctx.invoice_paid);
    }

    #[test]
    fn test_context_uses_camel_case() {
        let value = serde_json::to_value(DeliverableContext::new().with_max_revisions(3)).unwrap();
        assert_eq!(value["maxRevisions"], 3);
        assert_eq!(value["rawAccessGranted"], false);

        // Missing fields fall back to defaults
        let ctx: DeliverableContext =
            serde_json::from_value(serde_json::json!({ "revisionCount": 1 })).unwrap();
        assert_eq!(ctx.revision_count, 1);
        assert_eq!(ctx.max_revisions, DEFAULT_MAX_REVISIONS);
    }

    #[test]
    fn test_revision_limit_explanation() {
        let ctx = DeliverableContext {
            revision_count: 2,
            ..Default::default()
        };
        let reason = definition()
            .unwrap()
            .blocked_reason(&EventName::new(events::REQUEST_REVISION), &ctx)
            .unwrap()
            .unwrap();
        assert!(reason.starts_with("Revision limit reached (2 of 2"));
    }
}
