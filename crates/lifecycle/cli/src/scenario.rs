//! Scenario files: a cast of entities and the events sent to them
//!
//! ```yaml
//! name: Revision loop
//! entities:
//!   - id: d-1
//!     kind: deliverable
//!     context: { maxRevisions: 1 }
//! steps:
//!   - entity: d-1
//!     event: SUBMIT_FOR_REVIEW
//!     expect: inReview
//!   - entity: d-1
//!     event: REQUEST_REVISION
//!     payload: { feedback: "Tighter crop" }
//!     expect: revisionLimitMet
//! ```

use anyhow::{bail, Context, Result};
use lifecycle_types::{EntityId, EntityKind, Event};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// A scenario to replay through the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub entities: Vec<EntitySeed>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// An entity created before the first step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeed {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Context fields overriding the configured defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// One event sent to one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub entity: EntityId,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// State the entity must be in after the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

impl Step {
    pub fn to_event(&self) -> Event {
        let event = Event::new(self.event.as_str());
        match &self.payload {
            Some(payload) => event.with_payload(payload.clone()),
            None => event,
        }
    }
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(text).context("Invalid scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Every step must address a declared entity, declared once
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for seed in &self.entities {
            if !ids.insert(&seed.id) {
                bail!("Entity {} is declared twice", seed.id);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !ids.contains(&step.entity) {
                bail!("Step {} targets undeclared entity {}", index + 1, step.entity);
            }
        }
        Ok(())
    }

    pub fn kind_of(&self, entity: &EntityId) -> Option<EntityKind> {
        self.entities
            .iter()
            .find(|seed| &seed.id == entity)
            .map(|seed| seed.kind)
    }
}

/// Overlay `overrides` onto `base`, key by key
pub fn merge_context(base: Value, overrides: Option<&Value>) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Some(Value::Object(overrides))) => {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
            Value::Object(base)
        }
        (base, _) => base,
    }
}
