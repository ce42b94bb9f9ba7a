//! Property tests: lifecycle invariants hold for arbitrary event histories.

use lifecycle_engine::{Interpreter, NoEffect, Outcome};
use lifecycle_types::{EntityId, EntityKind, Event, EventName, StateId, WorkflowInstance};
use lifecycle_workflows::deliverable::{self, DeliverableContext};
use lifecycle_workflows::project::{self, ProjectContext};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DELIVERABLE_EVENTS: &[&str] = &[
    deliverable::events::SUBMIT_FOR_REVIEW,
    deliverable::events::APPROVE,
    deliverable::events::REQUEST_REVISION,
    deliverable::events::DELIVER,
    deliverable::events::APPROVE_ADDITIONAL_SCOPE,
    deliverable::events::PAYMENT_RECEIVED,
    deliverable::events::PAYMENT_REVOKED,
    deliverable::events::GRANT_RAW_ACCESS,
];

const DELIVERABLE_STATES: &[&str] = &[
    deliverable::states::IN_PROGRESS,
    deliverable::states::IN_REVIEW,
    deliverable::states::APPROVED,
    deliverable::states::REVISION_LIMIT_MET,
    deliverable::states::DELIVERED,
];

const PROJECT_EVENTS: &[&str] = &[
    project::events::SIGN_CONTRACT,
    project::events::RECEIVE_INITIAL_PAYMENT,
    project::events::START_PROJECT,
    project::events::PUT_ON_HOLD,
    project::events::RESUME_PROJECT,
    project::events::ALL_DELIVERABLES_COMPLETE,
    project::events::RECEIVE_FINAL_PAYMENT,
    project::events::COMPLETE_PROJECT,
    project::events::ARCHIVE_PROJECT,
];

const PROJECT_STATES: &[&str] = &[
    project::states::PENDING,
    project::states::ACTIVE,
    project::states::ON_HOLD,
    project::states::COMPLETED,
    project::states::ARCHIVED,
];

fn arb_deliverable_history() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(DELIVERABLE_EVENTS), 0..40)
}

fn arb_project_history() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(PROJECT_EVENTS), 0..40)
}

fn arb_deliverable_context() -> impl Strategy<Value = DeliverableContext> {
    (any::<bool>(), 0u32..6, 0u32..6, any::<bool>()).prop_map(
        |(invoice_paid, revision_count, max_revisions, raw_access_granted)| DeliverableContext {
            invoice_paid,
            revision_count,
            max_revisions,
            raw_access_granted,
        },
    )
}

fn arb_project_context() -> impl Strategy<Value = ProjectContext> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(contract_signed, initial_payment_received, all_deliverables_done, final_payment_received)| {
            ProjectContext {
                contract_signed,
                initial_payment_received,
                all_deliverables_done,
                final_payment_received,
            }
        },
    )
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Any history keeps a deliverable inside its state set, and delivery
    /// only ever happens with a paid invoice.
    #[test]
    fn deliverable_history_respects_state_set_and_payment_gate(
        history in arb_deliverable_history(),
        max_revisions in 1u32..5,
    ) {
        let def = deliverable::definition().unwrap();
        let interpreter = Interpreter::new();
        let mut inst = def.instantiate(
            EntityId::new("d-prop"),
            DeliverableContext::new().with_max_revisions(max_revisions),
        );

        for name in history {
            let applied = interpreter.apply(&def, &inst, &Event::new(name)).unwrap();
            prop_assert!(def.table().get_state(&applied.instance.state).is_some());

            if let Some(record) = &applied.record {
                if record.to_state == deliverable::states::DELIVERED
                    && record.from_state != deliverable::states::DELIVERED
                {
                    prop_assert_eq!(&record.context_after["invoicePaid"], &serde_json::json!(true));
                }
            }
            if inst.is_in(deliverable::states::DELIVERED) {
                prop_assert!(applied.instance.is_in(deliverable::states::DELIVERED));
            }
            inst = applied.instance;
        }
    }

    /// REQUEST_REVISION in review adds exactly one revision and routes on
    /// the new count.
    #[test]
    fn revision_request_increments_once(
        max_revisions in 1u32..8,
        used in 0u32..8,
        invoice_paid in any::<bool>(),
    ) {
        prop_assume!(used < max_revisions);
        let def = deliverable::definition().unwrap();
        let ctx = DeliverableContext {
            invoice_paid,
            revision_count: used,
            max_revisions,
            raw_access_granted: false,
        };
        let t = Interpreter::new()
            .transition(
                &def,
                &StateId::new(deliverable::states::IN_REVIEW),
                &ctx,
                &Event::new(deliverable::events::REQUEST_REVISION),
            )
            .unwrap();

        prop_assert_eq!(t.context.revision_count, used + 1);
        let expected = if used + 1 >= max_revisions {
            deliverable::states::REVISION_LIMIT_MET
        } else {
            deliverable::states::IN_PROGRESS
        };
        prop_assert_eq!(t.state, StateId::new(expected));
    }

    /// Projects only start and complete when both gates hold.
    #[test]
    fn project_history_respects_gates(history in arb_project_history()) {
        let def = project::definition().unwrap();
        let interpreter = Interpreter::new();
        let mut inst = def.instantiate(EntityId::new("p-prop"), ProjectContext::new());

        for name in history {
            let before = inst.context.clone();
            let applied = interpreter.apply(&def, &inst, &Event::new(name)).unwrap();

            if let Outcome::Transitioned { from, to } = &applied.outcome {
                if from == project::states::PENDING && to == project::states::ACTIVE {
                    prop_assert!(before.ready_to_start());
                }
                if from == project::states::ACTIVE && to == project::states::COMPLETED {
                    prop_assert!(before.ready_to_complete());
                }
            }
            inst = applied.instance;
        }
        prop_assert!(def.table().get_state(&inst.state).is_some());
    }

    /// Introspection agrees with the interpreter for every state-bound
    /// event in every state.
    #[test]
    fn deliverable_introspection_matches_interpreter(
        state in prop::sample::select(DELIVERABLE_STATES),
        ctx in arb_deliverable_context(),
    ) {
        let def = deliverable::definition().unwrap();
        let state = StateId::new(state);
        let allowed = def.allowed_actions(&state, &ctx).unwrap();
        let intro = def.introspect();

        for name in DELIVERABLE_EVENTS {
            let event = EventName::new(*name);
            if def.table().context_event(&event).is_some() {
                continue;
            }
            let t = Interpreter::new()
                .transition(&def, &state, &ctx, &Event::new(*name))
                .unwrap();
            let fires = !matches!(
                t.outcome,
                Outcome::Unchanged(NoEffect::NoMatchingTransition)
                    | Outcome::Unchanged(NoEffect::GuardRejected { .. })
            );
            prop_assert_eq!(allowed.contains(&event), fires);
            prop_assert_eq!(
                intro.blocked_reason_in(&state, &event, &ctx).unwrap().is_none(),
                fires
            );
        }
    }

    #[test]
    fn project_introspection_matches_interpreter(
        state in prop::sample::select(PROJECT_STATES),
        ctx in arb_project_context(),
    ) {
        let def = project::definition().unwrap();
        let state = StateId::new(state);
        let allowed = def.allowed_actions(&state, &ctx).unwrap();

        for name in PROJECT_EVENTS {
            let t = Interpreter::new()
                .transition(&def, &state, &ctx, &Event::new(*name))
                .unwrap();
            let fires = !matches!(
                t.outcome,
                Outcome::Unchanged(NoEffect::NoMatchingTransition)
                    | Outcome::Unchanged(NoEffect::GuardRejected { .. })
            );
            prop_assert_eq!(allowed.contains(&EventName::new(*name)), fires);
        }
    }

    /// Terminal states never move, whatever arrives.
    #[test]
    fn terminal_states_are_final(
        ctx in arb_deliverable_context(),
        name in prop::sample::select(DELIVERABLE_EVENTS),
    ) {
        let def = deliverable::definition().unwrap();
        let delivered = StateId::new(deliverable::states::DELIVERED);
        prop_assert!(def.allowed_actions(&delivered, &ctx).unwrap().is_empty());
        prop_assert!(def.introspect().outgoing_transitions(&delivered).unwrap().is_empty());

        let t = Interpreter::new()
            .transition(&def, &delivered, &ctx, &Event::new(name))
            .unwrap();
        prop_assert_eq!(t.state, delivered);
    }

    /// Dispatching the same event twice in a row: the second never changes anything.
    #[test]
    fn repeated_event_is_a_noop(
        history in arb_deliverable_history(),
        name in prop::sample::select(DELIVERABLE_EVENTS),
    ) {
        let def = deliverable::definition().unwrap();
        let interpreter = Interpreter::new();
        let start = def.instantiate(EntityId::new("d-idem"), DeliverableContext::new());
        let events: Vec<Event> = history.into_iter().map(Event::new).collect();
        let inst = interpreter.replay(&def, start, &events).unwrap().instance;

        let first = interpreter.apply(&def, &inst, &Event::new(name)).unwrap();
        let second = interpreter.apply(&def, &first.instance, &Event::new(name)).unwrap();
        prop_assert!(!second.outcome.is_change());
        prop_assert_eq!(second.instance, first.instance);
    }

    #[test]
    fn repeated_project_event_is_a_noop(
        ctx in arb_project_context(),
        state in prop::sample::select(PROJECT_STATES),
        name in prop::sample::select(PROJECT_EVENTS),
    ) {
        let def = project::definition().unwrap();
        let interpreter = Interpreter::new();
        let inst = WorkflowInstance::new(
            EntityId::new("p-idem"),
            EntityKind::Project,
            StateId::new(state),
            ctx,
        );

        let first = interpreter.apply(&def, &inst, &Event::new(name)).unwrap();
        let second = interpreter.apply(&def, &first.instance, &Event::new(name)).unwrap();
        prop_assert!(!second.outcome.is_change());
    }
}
