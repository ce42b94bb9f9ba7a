//! Interpreter: computes the next state and context for one event
//!
//! The interpreter is a pure function of (definition, state, context,
//! event). It never performs I/O; everything a dispatch changed is
//! returned as effect descriptions for the host to route.
//!
//! Resolution order for an event:
//! 1. Unknown event names fail with `InvalidEvent`.
//! 2. Context-only events run their guards and actions in any state and
//!    never move the instance.
//! 3. Otherwise the current state's binding is looked up and its
//!    candidates are tried in order; the first whose guards all pass
//!    fires. No binding or no passing candidate is a silent no-op.

use crate::definition::WorkflowDefinition;
use crate::guard_registry::{BlockedGuard, GuardEvaluator, GuardResult};
use lifecycle_types::{
    diff_fields, ActionName, AuditEntry, Effect, Event, StateId, TransitionRecord,
    WorkflowContext, WorkflowError, WorkflowInstance, WorkflowResult,
};
use serde::{Deserialize, Serialize};

// ── Outcomes ─────────────────────────────────────────────────────────

/// Why a dispatch left the instance untouched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoEffect {
    /// The event is known but the current state does not bind it
    NoMatchingTransition,
    /// A binding exists but no candidate's guards passed
    GuardRejected { reasons: Vec<BlockedGuard> },
    /// A candidate fired but neither state nor context changed
    NoChange,
}

impl std::fmt::Display for NoEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatchingTransition => write!(f, "no matching transition"),
            Self::GuardRejected { reasons } => {
                let reasons: Vec<_> = reasons.iter().map(|r| r.reason.as_str()).collect();
                write!(f, "guard rejected: {}", reasons.join("; "))
            }
            Self::NoChange => write!(f, "no change"),
        }
    }
}

/// What a dispatch did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The instance moved to another state (context may also have changed)
    Transitioned { from: StateId, to: StateId },
    /// Only the context changed
    ContextUpdated,
    /// Nothing changed
    Unchanged(NoEffect),
}

impl Outcome {
    /// Check if the dispatch changed the state or the context
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }

    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::Transitioned { .. })
    }

    pub fn is_guard_rejected(&self) -> bool {
        matches!(self, Self::Unchanged(NoEffect::GuardRejected { .. }))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transitioned { from, to } => write!(f, "{} -> {}", from, to),
            Self::ContextUpdated => write!(f, "context updated"),
            Self::Unchanged(reason) => write!(f, "unchanged ({})", reason),
        }
    }
}

/// Result of [`Interpreter::transition`]
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<C> {
    pub state: StateId,
    pub context: C,
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

/// Result of applying an event to a whole instance
#[derive(Clone, Debug, PartialEq)]
pub struct Applied<C> {
    pub instance: WorkflowInstance<C>,
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
    /// Audit record, present only when something changed
    pub record: Option<TransitionRecord>,
}

/// Result of replaying an event history
#[derive(Clone, Debug, PartialEq)]
pub struct Replay<C> {
    pub instance: WorkflowInstance<C>,
    pub records: Vec<TransitionRecord>,
}

// ── Interpreter ──────────────────────────────────────────────────────

/// Stateless transition interpreter
#[derive(Clone, Copy, Debug, Default)]
pub struct Interpreter {
    evaluator: GuardEvaluator,
}

/// The candidate chosen for an event
struct Selected<'a> {
    target: Option<&'a StateId>,
    actions: &'a [ActionName],
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            evaluator: GuardEvaluator::new(),
        }
    }

    /// Compute the next (state, context, effects) for `event`.
    ///
    /// Only unknown states or events are errors. Unbound events and
    /// rejected guards come back as [`Outcome::Unchanged`] with the
    /// input state and context.
    pub fn transition<C: WorkflowContext>(
        &self,
        definition: &WorkflowDefinition<C>,
        state: &StateId,
        context: &C,
        event: &Event,
    ) -> WorkflowResult<Transition<C>> {
        let spec = definition.ensure_state(state)?;
        definition.ensure_event(&event.name)?;

        let selected = match definition.table().context_event(&event.name) {
            Some(global) => {
                match self
                    .evaluator
                    .evaluate(definition.guards(), &global.guards, context, event)?
                {
                    GuardResult::Satisfied => Selected {
                        target: None,
                        actions: &global.actions,
                    },
                    GuardResult::Blocked { failed } => {
                        return Ok(self.rejected(definition, state, context, event, failed));
                    }
                }
            }
            None => {
                let Some(binding) = spec.binding(&event.name) else {
                    tracing::debug!(
                        kind = %definition.kind(),
                        state = %state,
                        event = %event.name,
                        "No transition for event in current state"
                    );
                    return Ok(unchanged(state, context, NoEffect::NoMatchingTransition));
                };

                let mut chosen = None;
                let mut last_failed = Vec::new();
                for candidate in &binding.candidates {
                    match self.evaluator.evaluate(
                        definition.guards(),
                        &candidate.guards,
                        context,
                        event,
                    )? {
                        GuardResult::Satisfied => {
                            chosen = Some(Selected {
                                target: candidate.target.as_ref(),
                                actions: &candidate.actions,
                            });
                            break;
                        }
                        GuardResult::Blocked { failed } => last_failed = failed,
                    }
                }

                match chosen {
                    Some(selected) => selected,
                    None => {
                        return Ok(self.rejected(definition, state, context, event, last_failed));
                    }
                }
            }
        };

        let mut next = context.clone();
        definition.actions().run(selected.actions, &mut next, event)?;
        let next_state = selected.target.unwrap_or(state).clone();

        let before = context.snapshot()?;
        let after = next.snapshot()?;
        let changes = diff_fields(&before, &after);

        if &next_state == state && changes.is_empty() {
            tracing::debug!(
                kind = %definition.kind(),
                state = %state,
                event = %event.name,
                "Event fired without changing state or context"
            );
            return Ok(unchanged(state, context, NoEffect::NoChange));
        }

        let mut effects = Vec::new();
        let outcome = if &next_state != state {
            effects.push(Effect::StateChanged {
                from: state.clone(),
                to: next_state.clone(),
            });
            Outcome::Transitioned {
                from: state.clone(),
                to: next_state.clone(),
            }
        } else {
            Outcome::ContextUpdated
        };
        if !changes.is_empty() {
            effects.push(Effect::ContextChanged {
                changes: changes.clone(),
            });
        }
        effects.push(Effect::Audit(AuditEntry {
            from_state: state.clone(),
            to_state: next_state.clone(),
            event: event.clone(),
            context_after: after,
            changes,
            timestamp: event.occurred_at,
        }));

        Ok(Transition {
            state: next_state,
            context: next,
            outcome,
            effects,
        })
    }

    /// Dispatch `event` to a whole instance.
    ///
    /// The returned instance is a new value; `updated_at` follows the
    /// event time when something changed.
    pub fn apply<C: WorkflowContext>(
        &self,
        definition: &WorkflowDefinition<C>,
        instance: &WorkflowInstance<C>,
        event: &Event,
    ) -> WorkflowResult<Applied<C>> {
        if instance.kind != definition.kind() {
            return Err(WorkflowError::KindMismatch {
                expected: definition.kind(),
                actual: instance.kind,
            });
        }

        let Transition {
            state,
            context,
            outcome,
            effects,
        } = self.transition(definition, &instance.state, &instance.context, event)?;

        let mut next = instance.clone();
        let record = if outcome.is_change() {
            next.state = state;
            next.context = context;
            next.updated_at = event.occurred_at;
            effects.iter().find_map(|effect| match effect {
                Effect::Audit(entry) => Some(TransitionRecord::from_entry(
                    instance.entity_id.clone(),
                    instance.kind,
                    entry.clone(),
                )),
                _ => None,
            })
        } else {
            None
        };

        Ok(Applied {
            instance: next,
            outcome,
            effects,
            record,
        })
    }

    /// Rebuild an instance by applying `events` in order.
    ///
    /// Stops at the first structural error.
    pub fn replay<'e, C: WorkflowContext>(
        &self,
        definition: &WorkflowDefinition<C>,
        instance: WorkflowInstance<C>,
        events: impl IntoIterator<Item = &'e Event>,
    ) -> WorkflowResult<Replay<C>> {
        let mut current = instance;
        let mut records = Vec::new();

        for event in events {
            let applied = self.apply(definition, &current, event)?;
            current = applied.instance;
            records.extend(applied.record);
        }

        Ok(Replay {
            instance: current,
            records,
        })
    }

    // ── Internal helpers ─────────────────────────────────────────────

    fn rejected<C: WorkflowContext>(
        &self,
        definition: &WorkflowDefinition<C>,
        state: &StateId,
        context: &C,
        event: &Event,
        failed: Vec<BlockedGuard>,
    ) -> Transition<C> {
        for blocked in &failed {
            tracing::debug!(
                kind = %definition.kind(),
                state = %state,
                event = %event.name,
                guard = %blocked.guard,
                reason = %blocked.reason,
                "Guard rejected event"
            );
        }
        unchanged(state, context, NoEffect::GuardRejected { reasons: failed })
    }
}

fn unchanged<C: Clone>(state: &StateId, context: &C, reason: NoEffect) -> Transition<C> {
    Transition {
        state: state.clone(),
        context: context.clone(),
        outcome: Outcome::Unchanged(reason),
        effects: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_registry::{Action, ActionRegistry};
    use crate::guard_registry::{Guard, GuardRegistry};
    use chrono::{TimeZone, Utc};
    use lifecycle_types::{
        ContextEventSpec, EntityId, EntityKind, StateSpec, TransitionCandidate, WorkflowTable,
    };

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        approved: bool,
        bounces: u32,
        tags: Vec<String>,
    }

    impl WorkflowContext for Ticket {
        const KIND: EntityKind = EntityKind::Deliverable;
    }

    fn make_definition() -> WorkflowDefinition<Ticket> {
        let mut table = WorkflowTable::new(EntityKind::Deliverable, "Ticket", "open");
        table.add_state(StateSpec::new("open")).unwrap();
        table.add_state(StateSpec::new("review")).unwrap();
        table.add_state(StateSpec::terminal("closed")).unwrap();
        table
            .on("open", "SUBMIT", TransitionCandidate::to("review"))
            .unwrap();
        table
            .on(
                "review",
                "CLOSE",
                TransitionCandidate::to("closed").guarded("isApproved"),
            )
            .unwrap();
        table
            .on(
                "review",
                "BOUNCE",
                TransitionCandidate::to("open").with_action("bounce"),
            )
            .unwrap();
        table
            .on("review", "APPROVE", TransitionCandidate::internal().with_action("approve"))
            .unwrap();
        table
            .add_context_event(ContextEventSpec::new("TAG").with_action("tag"))
            .unwrap();
        table
            .add_context_event(
                ContextEventSpec::new("STAMP")
                    .guarded("isApproved")
                    .with_action("tag"),
            )
            .unwrap();

        let guards = GuardRegistry::new()
            .with(Guard::new("isApproved", |ctx: &Ticket, _| ctx.approved, |_| {
                "Ticket has not been approved".into()
            }))
            .unwrap();
        let actions = ActionRegistry::new()
            .with(Action::new("bounce", |ctx: &mut Ticket, _| ctx.bounces += 1))
            .unwrap()
            .with(Action::new("approve", |ctx: &mut Ticket, _| ctx.approved = true))
            .unwrap()
            .with(Action::new("tag", |ctx: &mut Ticket, event| {
                let tag = event.payload_str("tag").unwrap_or("untagged").to_string();
                ctx.tags.push(tag);
            }))
            .unwrap();

        WorkflowDefinition::new(table, guards, actions).unwrap()
    }

    fn open() -> StateId {
        StateId::new("open")
    }

    fn review() -> StateId {
        StateId::new("review")
    }

    #[test]
    fn test_unconditional_transition() {
        let def = make_definition();
        let t = Interpreter::new()
            .transition(&def, &open(), &Ticket::default(), &Event::new("SUBMIT"))
            .unwrap();
        assert_eq!(t.state, review());
        assert!(t.outcome.is_state_change());
        assert!(matches!(t.effects[0], Effect::StateChanged { .. }));
        assert!(matches!(t.effects.last(), Some(Effect::Audit(_))));
    }

    #[test]
    fn test_unbound_event_is_a_silent_noop() {
        let def = make_definition();
        let ctx = Ticket::default();
        let t = Interpreter::new()
            .transition(&def, &open(), &ctx, &Event::new("CLOSE"))
            .unwrap();
        assert_eq!(t.state, open());
        assert_eq!(t.context, ctx);
        assert_eq!(t.outcome, Outcome::Unchanged(NoEffect::NoMatchingTransition));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_unknown_event_fails_loudly() {
        let def = make_definition();
        let result =
            Interpreter::new().transition(&def, &open(), &Ticket::default(), &Event::new("BURN"));
        assert!(matches!(result, Err(WorkflowError::InvalidEvent { .. })));
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let def = make_definition();
        let result = Interpreter::new().transition(
            &def,
            &StateId::new("limbo"),
            &Ticket::default(),
            &Event::new("SUBMIT"),
        );
        assert!(matches!(result, Err(WorkflowError::UnknownState { .. })));
    }

    #[test]
    fn test_guard_rejection_carries_reasons() {
        let def = make_definition();
        let t = Interpreter::new()
            .transition(&def, &review(), &Ticket::default(), &Event::new("CLOSE"))
            .unwrap();
        assert_eq!(t.state, review());
        assert!(t.outcome.is_guard_rejected());
        match t.outcome {
            Outcome::Unchanged(NoEffect::GuardRejected { reasons }) => {
                assert_eq!(reasons.len(), 1);
                assert_eq!(reasons[0].reason, "Ticket has not been approved");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_internal_candidate_updates_context_only() {
        let def = make_definition();
        let t = Interpreter::new()
            .transition(&def, &review(), &Ticket::default(), &Event::new("APPROVE"))
            .unwrap();
        assert_eq!(t.state, review());
        assert_eq!(t.outcome, Outcome::ContextUpdated);
        assert!(t.context.approved);
        match &t.effects[0] {
            Effect::ContextChanged { changes } => assert_eq!(changes[0].field, "approved"),
            other => panic!("unexpected effect: {:?}", other),
        }
    }

    #[test]
    fn test_repeat_without_change_is_noop() {
        let def = make_definition();
        let ctx = Ticket {
            approved: true,
            ..Default::default()
        };
        let t = Interpreter::new()
            .transition(&def, &review(), &ctx, &Event::new("APPROVE"))
            .unwrap();
        assert_eq!(t.outcome, Outcome::Unchanged(NoEffect::NoChange));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_context_event_accepted_in_terminal_state() {
        let def = make_definition();
        let event = Event::new("TAG").with_payload(serde_json::json!({ "tag": "urgent" }));
        let t = Interpreter::new()
            .transition(&def, &StateId::new("closed"), &Ticket::default(), &event)
            .unwrap();
        assert_eq!(t.state, StateId::new("closed"));
        assert_eq!(t.outcome, Outcome::ContextUpdated);
        assert_eq!(t.context.tags, vec!["urgent".to_string()]);
    }

    #[test]
    fn test_guarded_context_event() {
        let def = make_definition();
        let interpreter = Interpreter::new();
        let blocked = interpreter
            .transition(&def, &open(), &Ticket::default(), &Event::new("STAMP"))
            .unwrap();
        assert!(blocked.outcome.is_guard_rejected());

        let approved = Ticket {
            approved: true,
            ..Default::default()
        };
        let stamped = interpreter
            .transition(&def, &open(), &approved, &Event::new("STAMP"))
            .unwrap();
        assert_eq!(stamped.outcome, Outcome::ContextUpdated);
    }

    #[test]
    fn test_apply_stamps_record_and_time() {
        let def = make_definition();
        let inst = def.instantiate(EntityId::new("t-1"), Ticket::default());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let applied = Interpreter::new()
            .apply(&def, &inst, &Event::new("SUBMIT").at(at))
            .unwrap();

        assert!(applied.instance.is_in("review"));
        assert_eq!(applied.instance.updated_at, at);
        assert_eq!(applied.instance.created_at, inst.created_at);

        let record = applied.record.unwrap();
        assert_eq!(record.entity_id, EntityId::new("t-1"));
        assert_eq!(record.from_state, open());
        assert_eq!(record.to_state, review());
        assert_eq!(record.timestamp, at);
    }

    #[test]
    fn test_apply_noop_has_no_record() {
        let def = make_definition();
        let inst = def.instantiate(EntityId::new("t-1"), Ticket::default());
        let applied = Interpreter::new()
            .apply(&def, &inst, &Event::new("CLOSE"))
            .unwrap();
        assert!(applied.record.is_none());
        assert_eq!(applied.instance, inst);
    }

    #[test]
    fn test_replay_collects_records() {
        let def = make_definition();
        let inst = def.instantiate(EntityId::new("t-2"), Ticket::default());
        let events = vec![
            Event::new("SUBMIT"),
            Event::new("CLOSE"),
            Event::new("BOUNCE"),
            Event::new("SUBMIT"),
            Event::new("APPROVE"),
            Event::new("CLOSE"),
        ];
        let replay = Interpreter::new().replay(&def, inst, &events).unwrap();

        assert!(replay.instance.is_in("closed"));
        assert_eq!(replay.instance.context.bounces, 1);
        // the first CLOSE was rejected and left no record
        assert_eq!(replay.records.len(), 5);
    }
}
