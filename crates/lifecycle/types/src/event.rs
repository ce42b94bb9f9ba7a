//! Events: named occurrences dispatched to a lifecycle
//!
//! The payload is opaque JSON. The interpreter only hands it to actions
//! and copies it into the audit record.

use crate::EventName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event dispatched to a workflow instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, matched against the workflow table
    pub name: EventName,
    /// Optional opaque payload (e.g. revision feedback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// When the event occurred
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: EventName::new(name),
            payload: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Pin the occurrence time (replays, tests)
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Look up a string field in the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(|v| v.as_str())
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
