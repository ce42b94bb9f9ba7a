//! Guard registry: named predicates with their explanations
//!
//! Each guard carries the predicate the interpreter evaluates and the
//! explanation template introspection reports when it fails. Both the
//! transition table and the introspection API refer to guards by name,
//! so a block reason can never disagree with the check that produced it.
//!
//! Evaluation is pure: no side effects, no I/O.

use lifecycle_types::{Event, GuardName, WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Predicate over (context, event)
pub type GuardPredicate<C> = fn(&C, &Event) -> bool;

/// Builds the human-readable reason a guard is failing for a context
pub type GuardExplanation<C> = fn(&C) -> String;

/// A named guard
pub struct Guard<C> {
    pub name: GuardName,
    pub description: String,
    predicate: GuardPredicate<C>,
    explain: GuardExplanation<C>,
}

impl<C> Guard<C> {
    pub fn new(
        name: impl Into<String>,
        predicate: GuardPredicate<C>,
        explain: GuardExplanation<C>,
    ) -> Self {
        Self {
            name: GuardName::new(name),
            description: String::new(),
            predicate,
            explain,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn passes(&self, context: &C, event: &Event) -> bool {
        (self.predicate)(context, event)
    }

    pub fn explain(&self, context: &C) -> String {
        (self.explain)(context)
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            predicate: self.predicate,
            explain: self.explain,
        }
    }
}

impl<C> std::fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// All guards available to one workflow definition
pub struct GuardRegistry<C> {
    guards: HashMap<GuardName, Guard<C>>,
}

impl<C> GuardRegistry<C> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
        }
    }

    /// Register a guard
    pub fn register(&mut self, guard: Guard<C>) -> WorkflowResult<()> {
        if self.guards.contains_key(&guard.name) {
            return Err(WorkflowError::DuplicateGuard(guard.name));
        }
        self.guards.insert(guard.name.clone(), guard);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, guard: Guard<C>) -> WorkflowResult<Self> {
        self.register(guard)?;
        Ok(self)
    }

    pub fn get(&self, name: &GuardName) -> WorkflowResult<&Guard<C>> {
        self.guards
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownGuard(name.clone()))
    }

    pub fn contains(&self, name: &GuardName) -> bool {
        self.guards.contains_key(name)
    }

    /// Registered guard names, sorted
    pub fn names(&self) -> Vec<&GuardName> {
        let mut names: Vec<_> = self.guards.keys().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl<C> Default for GuardRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for GuardRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            guards: self.guards.clone(),
        }
    }
}

impl<C> std::fmt::Debug for GuardRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRegistry")
            .field("guards", &self.names())
            .finish()
    }
}

// ── Evaluation ───────────────────────────────────────────────────────

/// A guard that did not hold, with its explanation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedGuard {
    pub guard: GuardName,
    pub reason: String,
}

/// Result of evaluating a conjunction of guards
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardResult {
    /// Every guard holds; the candidate can fire
    Satisfied,
    /// At least one guard failed
    Blocked { failed: Vec<BlockedGuard> },
}

impl GuardResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }

    /// Failed guards (empty when satisfied)
    pub fn failed(&self) -> &[BlockedGuard] {
        match self {
            Self::Satisfied => &[],
            Self::Blocked { failed } => failed,
        }
    }

    /// Explanations of all failed guards joined into one sentence
    pub fn summary(&self) -> Option<String> {
        match self {
            Self::Satisfied => None,
            Self::Blocked { failed } => Some(
                failed
                    .iter()
                    .map(|b| b.reason.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Evaluates guard conjunctions against a registry
#[derive(Clone, Copy, Debug, Default)]
pub struct GuardEvaluator;

impl GuardEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every named guard and collect the ones that fail.
    ///
    /// An empty list is always satisfied. Every guard is evaluated so the
    /// caller gets all explanations, not just the first.
    pub fn evaluate<C>(
        &self,
        registry: &GuardRegistry<C>,
        guards: &[GuardName],
        context: &C,
        event: &Event,
    ) -> WorkflowResult<GuardResult> {
        let mut failed = Vec::new();
        for name in guards {
            let guard = registry.get(name)?;
            if !guard.passes(context, event) {
                failed.push(BlockedGuard {
                    guard: name.clone(),
                    reason: guard.explain(context),
                });
            }
        }

        if failed.is_empty() {
            Ok(GuardResult::Satisfied)
        } else {
            Ok(GuardResult::Blocked { failed })
        }
    }
}
