//! End-to-end project lifecycles driven through the interpreter.

use lifecycle_engine::{Interpreter, Outcome, WorkflowDefinition};
use lifecycle_types::{EntityId, Event, EventName, StateId, WorkflowInstance};
use lifecycle_workflows::project::{self, events, states, ProjectContext};

fn def() -> WorkflowDefinition<ProjectContext> {
    project::definition().unwrap()
}

fn run(
    def: &WorkflowDefinition<ProjectContext>,
    inst: WorkflowInstance<ProjectContext>,
    names: &[&str],
) -> WorkflowInstance<ProjectContext> {
    let history: Vec<Event> = names.iter().map(|name| Event::new(*name)).collect();
    Interpreter::new().replay(def, inst, &history).unwrap().instance
}

#[test]
fn test_start_requires_contract_and_deposit() {
    let def = def();
    let interpreter = Interpreter::new();
    let inst = def.instantiate(EntityId::new("p-1"), ProjectContext::new());

    let early = interpreter
        .apply(&def, &inst, &Event::new(events::START_PROJECT))
        .unwrap();
    assert!(early.outcome.is_guard_rejected());
    assert!(early.instance.is_in(states::PENDING));

    let signed = interpreter
        .apply(&def, &inst, &Event::new(events::SIGN_CONTRACT))
        .unwrap();
    assert_eq!(signed.outcome, Outcome::ContextUpdated);
    assert!(signed.instance.context.contract_signed);
    assert!(signed.instance.is_in(states::PENDING));

    let deposit = interpreter
        .apply(&def, &signed.instance, &Event::new(events::RECEIVE_INITIAL_PAYMENT))
        .unwrap();
    assert!(deposit.instance.context.initial_payment_received);
    assert!(deposit.instance.is_in(states::PENDING));

    let started = interpreter
        .apply(&def, &deposit.instance, &Event::new(events::START_PROJECT))
        .unwrap();
    assert!(started.instance.is_in(states::ACTIVE));
}

#[test]
fn test_preconditions_arrive_in_any_order() {
    let def = def();
    let inst = def.instantiate(EntityId::new("p-2"), ProjectContext::new());
    let inst = run(
        &def,
        inst,
        &[
            events::RECEIVE_INITIAL_PAYMENT,
            events::START_PROJECT,
            events::SIGN_CONTRACT,
            events::START_PROJECT,
        ],
    );
    assert!(inst.is_in(states::ACTIVE));
}

#[test]
fn test_full_lifecycle_with_hold() {
    let def = def();
    let inst = def.instantiate(EntityId::new("p-3"), ProjectContext::new());
    let history: Vec<Event> = [
        events::SIGN_CONTRACT,
        events::RECEIVE_INITIAL_PAYMENT,
        events::START_PROJECT,
        events::PUT_ON_HOLD,
        events::RESUME_PROJECT,
        events::ALL_DELIVERABLES_COMPLETE,
        events::COMPLETE_PROJECT,
        events::RECEIVE_FINAL_PAYMENT,
        events::COMPLETE_PROJECT,
        events::ARCHIVE_PROJECT,
    ]
    .iter()
    .map(|name| Event::new(*name))
    .collect();

    let replay = Interpreter::new().replay(&def, inst, &history).unwrap();
    assert!(replay.instance.is_in(states::ARCHIVED));
    // the first COMPLETE_PROJECT was blocked and left no record
    assert_eq!(replay.records.len(), 9);

    let transitions: Vec<String> = replay
        .records
        .iter()
        .filter(|r| r.is_state_change())
        .map(|r| format!("{}->{}", r.from_state, r.to_state))
        .collect();
    assert_eq!(
        transitions,
        vec![
            "pending->active",
            "active->onHold",
            "onHold->active",
            "active->completed",
            "completed->archived",
        ]
    );
}

#[test]
fn test_completion_blocked_reasons() {
    let def = def();
    let ctx = ProjectContext {
        contract_signed: true,
        initial_payment_received: true,
        all_deliverables_done: true,
        final_payment_received: false,
    };
    let reason = def
        .blocked_reason(&EventName::new(events::COMPLETE_PROJECT), &ctx)
        .unwrap();
    assert_eq!(reason.as_deref(), Some("Final payment has not been received"));
    assert_eq!(
        def.blocked_reason(&EventName::new(events::START_PROJECT), &ctx)
            .unwrap(),
        None
    );
}

#[test]
fn test_allowed_actions_per_state() {
    let def = def();
    let ctx = ProjectContext::new();

    let pending = def
        .allowed_actions(&StateId::new(states::PENDING), &ctx)
        .unwrap();
    assert_eq!(
        pending,
        vec![
            EventName::new(events::SIGN_CONTRACT),
            EventName::new(events::RECEIVE_INITIAL_PAYMENT),
        ]
    );

    let on_hold = def
        .allowed_actions(&StateId::new(states::ON_HOLD), &ctx)
        .unwrap();
    assert_eq!(on_hold, vec![EventName::new(events::RESUME_PROJECT)]);

    let archived = def
        .allowed_actions(&StateId::new(states::ARCHIVED), &ctx)
        .unwrap();
    assert!(archived.is_empty());
}

#[test]
fn test_on_hold_ignores_work_events() {
    let def = def();
    let inst = def.instantiate(EntityId::new("p-4"), ProjectContext::new());
    let inst = run(
        &def,
        inst,
        &[
            events::SIGN_CONTRACT,
            events::RECEIVE_INITIAL_PAYMENT,
            events::START_PROJECT,
            events::PUT_ON_HOLD,
            events::ALL_DELIVERABLES_COMPLETE,
        ],
    );
    assert!(inst.is_in(states::ON_HOLD));
    assert!(!inst.context.all_deliverables_done);
}
