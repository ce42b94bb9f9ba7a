//! Audit sinks: where transition records go after a commit
//!
//! Records are append-only. The in-memory log keeps them in commit
//! order and can be browsed per entity; the tracing sink turns each
//! record into a structured log line.

use crate::error::RuntimeResult;
use async_trait::async_trait;
use lifecycle_types::{EntityId, TransitionRecord};
use tokio::sync::RwLock;

/// Receives one record per committed dispatch
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: TransitionRecord) -> RuntimeResult<()>;
}

/// Append-only in-memory audit log
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<TransitionRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in commit order
    pub async fn all(&self) -> Vec<TransitionRecord> {
        self.records.read().await.clone()
    }

    /// History of one entity, in commit order
    pub async fn records_for(&self, entity_id: &EntityId) -> Vec<TransitionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| &r.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, record: TransitionRecord) -> RuntimeResult<()> {
        tracing::trace!(entity = %record.entity_id, event = %record.event, "Audit recorded");
        self.records.write().await.push(record);
        Ok(())
    }
}

/// Audit sink that emits each record as a structured log event
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: TransitionRecord) -> RuntimeResult<()> {
        let changed: Vec<&str> = record.changes.iter().map(|c| c.field.as_str()).collect();
        tracing::info!(
            target: "lifecycle::audit",
            entity = %record.entity_id,
            kind = %record.kind,
            from = %record.from_state,
            to = %record.to_state,
            event = %record.event,
            changed = ?changed,
            at = %record.timestamp,
            "Transition committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lifecycle_types::{EntityKind, Event, StateId};

    fn make_record(entity: &str, from: &str, to: &str) -> TransitionRecord {
        TransitionRecord {
            entity_id: EntityId::new(entity),
            kind: EntityKind::Deliverable,
            from_state: StateId::new(from),
            to_state: StateId::new(to),
            event: Event::new("SUBMIT_FOR_REVIEW"),
            context_after: serde_json::json!({}),
            changes: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_keeps_commit_order() {
        let log = InMemoryAuditLog::new();
        log.record(make_record("d-1", "inProgress", "inReview")).await.unwrap();
        log.record(make_record("d-2", "inProgress", "inReview")).await.unwrap();
        log.record(make_record("d-1", "inReview", "approved")).await.unwrap();

        assert_eq!(log.len().await, 3);
        let history = log.records_for(&EntityId::new("d-1")).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].to_state, StateId::new("approved"));
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_records() {
        let sink = TracingAuditSink;
        assert!(sink.record(make_record("d-1", "a", "b")).await.is_ok());
    }
}
