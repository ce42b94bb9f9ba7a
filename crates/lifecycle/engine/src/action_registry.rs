//! Action registry: named context transforms
//!
//! Actions are pure functions over the context. They may read the event
//! payload but never perform I/O; anything observable outside the
//! context is expressed as an effect by the interpreter.

use lifecycle_types::{ActionName, Event, WorkflowError, WorkflowResult};
use std::collections::HashMap;

/// Transform applied to a context when a candidate fires
pub type ActionFn<C> = fn(&mut C, &Event);

/// A named action
pub struct Action<C> {
    pub name: ActionName,
    pub description: String,
    apply: ActionFn<C>,
}

impl<C> Action<C> {
    pub fn new(name: impl Into<String>, apply: ActionFn<C>) -> Self {
        Self {
            name: ActionName::new(name),
            description: String::new(),
            apply,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn apply(&self, context: &mut C, event: &Event) {
        (self.apply)(context, event)
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            apply: self.apply,
        }
    }
}

impl<C> std::fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// All actions available to one workflow definition
pub struct ActionRegistry<C> {
    actions: HashMap<ActionName, Action<C>>,
}

impl<C> ActionRegistry<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Action<C>) -> WorkflowResult<()> {
        if self.actions.contains_key(&action.name) {
            return Err(WorkflowError::DuplicateAction(action.name));
        }
        self.actions.insert(action.name.clone(), action);
        Ok(())
    }

    pub fn with(mut self, action: Action<C>) -> WorkflowResult<Self> {
        self.register(action)?;
        Ok(self)
    }

    pub fn get(&self, name: &ActionName) -> WorkflowResult<&Action<C>> {
        self.actions
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownAction(name.clone()))
    }

    pub fn contains(&self, name: &ActionName) -> bool {
        self.actions.contains_key(name)
    }

    /// Apply the named actions in order
    pub fn run(&self, names: &[ActionName], context: &mut C, event: &Event) -> WorkflowResult<()> {
        for name in names {
            self.get(name)?.apply(context, event);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ActionRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ActionRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &names)
            .finish()
    }
}
