//! Workflow tables: the declarative description of a lifecycle
//!
//! A WorkflowTable lists the states of one entity kind, the events each
//! state accepts and, for each event, the ordered candidate transitions.
//! The first candidate whose guards all pass is taken. Context-only
//! events live in their own list and are accepted in every state.
//!
//! Tables only carry names. Guard predicates and action functions are
//! resolved by the engine, which keeps the table serializable.

use crate::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

// ── Identifiers ──────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Identifier of a state within a workflow table
    StateId
);
string_id!(
    /// Name of an event (e.g. `SUBMIT_FOR_REVIEW`)
    EventName
);
string_id!(
    /// Name of a registered guard predicate
    GuardName
);
string_id!(
    /// Name of a registered context action
    ActionName
);

/// The kind of business entity a lifecycle belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A unit of work handed to a client
    Deliverable,
    /// A client engagement
    Project,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deliverable => "deliverable",
            Self::Project => "project",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deliverable" => Ok(Self::Deliverable),
            "project" => Ok(Self::Project),
            other => Err(WorkflowError::UnknownKind(other.to_string())),
        }
    }
}

// ── Transition Candidates ────────────────────────────────────────────

/// One possible reaction of a state to an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCandidate {
    /// Guards that must all pass for this candidate to fire
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<GuardName>,
    /// Target state; `None` keeps the current state (context-only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<StateId>,
    /// Actions applied to the context, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionName>,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

impl TransitionCandidate {
    /// A candidate that moves to `target`
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            guards: Vec::new(),
            target: Some(StateId::new(target)),
            actions: Vec::new(),
            label: String::new(),
        }
    }

    /// A candidate that stays in the current state and only runs actions
    pub fn internal() -> Self {
        Self {
            guards: Vec::new(),
            target: None,
            actions: Vec::new(),
            label: String::new(),
        }
    }

    pub fn guarded(mut self, guard: impl Into<String>) -> Self {
        self.guards.push(GuardName::new(guard));
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(ActionName::new(action));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Check if this candidate is unconditional
    pub fn is_unguarded(&self) -> bool {
        self.guards.is_empty()
    }
}

/// The candidates a state tries, in order, when it receives an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBinding {
    pub event: EventName,
    pub candidates: Vec<TransitionCandidate>,
}

// ── States ───────────────────────────────────────────────────────────

/// A state of the lifecycle and the events it accepts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpec {
    pub id: StateId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Terminal states end the active lifecycle
    #[serde(default)]
    pub terminal: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<EventBinding>,
}

impl StateSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: StateId::new(id),
            description: String::new(),
            terminal: false,
            bindings: Vec::new(),
        }
    }

    /// Create a terminal state
    pub fn terminal(id: impl Into<String>) -> Self {
        Self {
            terminal: true,
            ..Self::new(id)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Get the binding for an event
    pub fn binding(&self, event: &EventName) -> Option<&EventBinding> {
        self.bindings.iter().find(|b| &b.event == event)
    }

    /// Events accepted in this state, in declaration order
    pub fn events(&self) -> impl Iterator<Item = &EventName> {
        self.bindings.iter().map(|b| &b.event)
    }
}

// ── Context-only Events ──────────────────────────────────────────────

/// An event accepted in any state that mutates context only
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEventSpec {
    pub event: EventName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<GuardName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionName>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ContextEventSpec {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: EventName::new(event),
            guards: Vec::new(),
            actions: Vec::new(),
            description: String::new(),
        }
    }

    pub fn guarded(mut self, guard: impl Into<String>) -> Self {
        self.guards.push(GuardName::new(guard));
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(ActionName::new(action));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ── Workflow Table ───────────────────────────────────────────────────

/// The declarative lifecycle of one entity kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTable {
    pub kind: EntityKind,
    pub name: String,
    /// Version for tracking table evolution
    pub version: u32,
    pub initial: StateId,
    pub states: Vec<StateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_events: Vec<ContextEventSpec>,
}

impl WorkflowTable {
    pub fn new(kind: EntityKind, name: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: 1,
            initial: StateId::new(initial),
            states: Vec::new(),
            context_events: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add a state to the table
    pub fn add_state(&mut self, state: StateSpec) -> WorkflowResult<()> {
        if self.states.iter().any(|s| s.id == state.id) {
            return Err(WorkflowError::DuplicateState(state.id));
        }
        self.states.push(state);
        Ok(())
    }

    /// Append a candidate to the binding of `event` in `state`.
    ///
    /// Candidates are tried in the order they were added.
    pub fn on(
        &mut self,
        state: &str,
        event: &str,
        candidate: TransitionCandidate,
    ) -> WorkflowResult<()> {
        let kind = self.kind;
        let spec = self
            .states
            .iter_mut()
            .find(|s| s.id == state)
            .ok_or_else(|| WorkflowError::UnknownState {
                kind,
                state: StateId::new(state),
            })?;

        if spec.terminal {
            return Err(WorkflowError::TerminalStateHasTransitions(spec.id.clone()));
        }

        match spec.bindings.iter_mut().find(|b| b.event == event) {
            Some(binding) => binding.candidates.push(candidate),
            None => spec.bindings.push(EventBinding {
                event: EventName::new(event),
                candidates: vec![candidate],
            }),
        }
        Ok(())
    }

    /// Add an event accepted in every state that only touches context
    pub fn add_context_event(&mut self, spec: ContextEventSpec) -> WorkflowResult<()> {
        if self.context_events.iter().any(|e| e.event == spec.event) {
            return Err(WorkflowError::DuplicateContextEvent(spec.event));
        }
        self.context_events.push(spec);
        Ok(())
    }

    /// Get a state by ID
    pub fn get_state(&self, id: &StateId) -> Option<&StateSpec> {
        self.states.iter().find(|s| &s.id == id)
    }

    /// Get the binding of an event in a state
    pub fn binding(&self, state: &StateId, event: &EventName) -> Option<&EventBinding> {
        self.get_state(state).and_then(|s| s.binding(event))
    }

    /// Get a context-only event by name
    pub fn context_event(&self, event: &EventName) -> Option<&ContextEventSpec> {
        self.context_events.iter().find(|e| &e.event == event)
    }

    /// Check if a state is terminal
    pub fn is_terminal(&self, state: &StateId) -> bool {
        self.get_state(state).map(|s| s.terminal).unwrap_or(false)
    }

    /// All terminal states
    pub fn terminal_states(&self) -> Vec<&StateId> {
        self.states
            .iter()
            .filter(|s| s.terminal)
            .map(|s| &s.id)
            .collect()
    }

    /// Check if an event name is known to this table at all
    pub fn recognizes(&self, event: &EventName) -> bool {
        self.context_event(event).is_some()
            || self.states.iter().any(|s| s.binding(event).is_some())
    }

    /// Every event name in the table, state-bound first, without duplicates
    pub fn event_names(&self) -> Vec<&EventName> {
        let mut seen = HashSet::new();
        self.states
            .iter()
            .flat_map(|s| s.events())
            .chain(self.context_events.iter().map(|e| &e.event))
            .filter(|e| seen.insert(*e))
            .collect()
    }

    /// States that bind `event`, in declaration order
    pub fn states_accepting(&self, event: &EventName) -> Vec<&StateSpec> {
        self.states
            .iter()
            .filter(|s| s.binding(event).is_some())
            .collect()
    }

    /// Every guard name referenced by the table
    pub fn referenced_guards(&self) -> Vec<&GuardName> {
        let mut seen = HashSet::new();
        self.states
            .iter()
            .flat_map(|s| s.bindings.iter())
            .flat_map(|b| b.candidates.iter())
            .flat_map(|c| c.guards.iter())
            .chain(self.context_events.iter().flat_map(|e| e.guards.iter()))
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Every action name referenced by the table
    pub fn referenced_actions(&self) -> Vec<&ActionName> {
        let mut seen = HashSet::new();
        self.states
            .iter()
            .flat_map(|s| s.bindings.iter())
            .flat_map(|b| b.candidates.iter())
            .flat_map(|c| c.actions.iter())
            .chain(self.context_events.iter().flat_map(|e| e.actions.iter()))
            .filter(|a| seen.insert(*a))
            .collect()
    }

    /// Validate the table for structural correctness
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.states.is_empty() {
            return Err(WorkflowError::ValidationError(
                "Workflow must have at least one state".into(),
            ));
        }

        if self.get_state(&self.initial).is_none() {
            return Err(WorkflowError::UnknownState {
                kind: self.kind,
                state: self.initial.clone(),
            });
        }

        for state in &self.states {
            if state.terminal && !state.bindings.is_empty() {
                return Err(WorkflowError::TerminalStateHasTransitions(state.id.clone()));
            }
            if !state.terminal && state.bindings.is_empty() {
                return Err(WorkflowError::ValidationError(format!(
                    "State '{}' has no transitions but is not marked terminal",
                    state.id
                )));
            }

            for binding in &state.bindings {
                if binding.candidates.is_empty() {
                    return Err(WorkflowError::ValidationError(format!(
                        "Event '{}' in state '{}' has no candidates",
                        binding.event, state.id
                    )));
                }
                for target in binding.candidates.iter().filter_map(|c| c.target.as_ref()) {
                    if self.get_state(target).is_none() {
                        return Err(WorkflowError::UnknownState {
                            kind: self.kind,
                            state: target.clone(),
                        });
                    }
                }
            }
        }

        for spec in &self.context_events {
            if self.states.iter().any(|s| s.binding(&spec.event).is_some()) {
                return Err(WorkflowError::ContextEventCollision(spec.event.clone()));
            }
        }

        // Every state must be reachable from the initial state
        let reachable = self.reachable_states();
        if let Some(island) = self.states.iter().find(|s| !reachable.contains(&s.id)) {
            return Err(WorkflowError::UnreachableState(island.id.clone()));
        }

        Ok(())
    }

    /// States reachable from the initial state through state bindings
    pub fn reachable_states(&self) -> HashSet<StateId> {
        let mut reached = HashSet::new();
        let mut queue = VecDeque::new();
        reached.insert(self.initial.clone());
        queue.push_back(self.initial.clone());

        while let Some(current) = queue.pop_front() {
            let Some(spec) = self.get_state(&current) else {
                continue;
            };
            for target in spec
                .bindings
                .iter()
                .flat_map(|b| b.candidates.iter())
                .filter_map(|c| c.target.as_ref())
            {
                if reached.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }
        }

        reached
    }
}
