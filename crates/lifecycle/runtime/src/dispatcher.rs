//! Dispatcher: the load, compute, commit cycle around the interpreter
//!
//! The interpreter is pure and has no locks. The dispatcher makes it
//! safe under concurrent callers by committing with a version check and
//! recomputing from a fresh snapshot whenever another writer got there
//! first. Audit records are emitted only after a successful commit, and a
//! sink failure at that point is reported on the [`DispatchReport`].

use crate::audit::AuditSink;
use crate::config::DispatchConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::store::{SnapshotStore, Version, VersionedInstance};
use lifecycle_engine::{Interpreter, Outcome, WorkflowDefinition};
use lifecycle_types::{
    Effect, EntityId, Event, EventName, TransitionRecord, WorkflowContext, WorkflowInstance,
};
use std::sync::Arc;

/// What a dispatch did, as committed
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchReport<C> {
    /// The instance after the dispatch
    pub instance: WorkflowInstance<C>,
    /// Stored version after the dispatch (unchanged for no-ops)
    pub version: Version,
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
    pub record: Option<TransitionRecord>,
    /// Load-compute-commit attempts used
    pub attempts: u32,
    /// Set when the commit succeeded but the audit sink rejected the record
    pub audit_error: Option<String>,
}

impl<C> DispatchReport<C> {
    /// Check if the record reached the audit sink (trivially true for no-ops)
    pub fn is_audited(&self) -> bool {
        self.audit_error.is_none()
    }
}

/// Dispatches events to stored instances of one entity kind
pub struct Dispatcher<C: WorkflowContext, S: SnapshotStore<C>> {
    definition: Arc<WorkflowDefinition<C>>,
    store: Arc<S>,
    audit: Arc<dyn AuditSink>,
    interpreter: Interpreter,
    config: DispatchConfig,
}

impl<C: WorkflowContext, S: SnapshotStore<C>> Dispatcher<C, S> {
    pub fn new(
        definition: Arc<WorkflowDefinition<C>>,
        store: Arc<S>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            definition,
            store,
            audit,
            interpreter: Interpreter::new(),
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn definition(&self) -> &WorkflowDefinition<C> {
        &self.definition
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a stored instance in the initial state
    pub async fn create(
        &self,
        entity_id: EntityId,
        context: C,
    ) -> RuntimeResult<VersionedInstance<C>> {
        let instance = self.definition.instantiate(entity_id, context);
        let stored = self.store.create(instance).await?;
        tracing::info!(
            entity = %stored.instance.entity_id,
            kind = %stored.instance.kind,
            state = %stored.instance.state,
            "Lifecycle instance created"
        );
        Ok(stored)
    }

    /// Load the latest snapshot, failing if it does not exist
    pub async fn load(&self, entity_id: &EntityId) -> RuntimeResult<VersionedInstance<C>> {
        self.store
            .load(entity_id)
            .await?
            .ok_or_else(|| RuntimeError::InstanceNotFound(entity_id.clone()))
    }

    /// Dispatch `event` to a stored instance.
    ///
    /// No-op outcomes are returned without writing anything. A stale
    /// snapshot is reloaded and recomputed up to `max_attempts` times.
    pub async fn dispatch(
        &self,
        entity_id: &EntityId,
        event: Event,
    ) -> RuntimeResult<DispatchReport<C>> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let snapshot = self.load(entity_id).await?;
            let applied = self
                .interpreter
                .apply(&self.definition, &snapshot.instance, &event)?;

            if !applied.outcome.is_change() {
                return Ok(DispatchReport {
                    instance: applied.instance,
                    version: snapshot.version,
                    outcome: applied.outcome,
                    effects: applied.effects,
                    record: None,
                    attempts: attempt,
                    audit_error: None,
                });
            }

            match self
                .store
                .save(applied.instance.clone(), snapshot.version)
                .await
            {
                Ok(version) => {
                    tracing::info!(
                        entity = %entity_id,
                        kind = %applied.instance.kind,
                        event = %event.name,
                        outcome = %applied.outcome,
                        version,
                        "Lifecycle dispatch committed"
                    );
                    // Already committed: audit failures are reported, not raised
                    let mut audit_error = None;
                    if let Some(record) = &applied.record {
                        if let Err(err) = self.audit.record(record.clone()).await {
                            tracing::error!(
                                entity = %entity_id,
                                event = %event.name,
                                version,
                                error = %err,
                                "Audit sink rejected a committed transition"
                            );
                            audit_error = Some(err.to_string());
                        }
                    }
                    return Ok(DispatchReport {
                        instance: applied.instance,
                        version,
                        outcome: applied.outcome,
                        effects: applied.effects,
                        record: applied.record,
                        attempts: attempt,
                        audit_error,
                    });
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        entity = %entity_id,
                        event = %event.name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Stale snapshot, retrying dispatch"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(RuntimeError::RetriesExhausted {
            entity_id: entity_id.clone(),
            attempts: max_attempts,
        })
    }

    /// Events that would currently fire for a stored instance
    pub async fn allowed_actions(&self, entity_id: &EntityId) -> RuntimeResult<Vec<EventName>> {
        let snapshot = self.load(entity_id).await?;
        let intro = self.definition.introspect();
        let mut allowed = intro.allowed_actions(&snapshot.instance.state, &snapshot.instance.context)?;
        allowed.extend(intro.allowed_context_events(&snapshot.instance.context)?);
        Ok(allowed)
    }

    /// Why `action` cannot currently fire for a stored instance
    pub async fn blocked_reason(
        &self,
        entity_id: &EntityId,
        action: &EventName,
    ) -> RuntimeResult<Option<String>> {
        let snapshot = self.load(entity_id).await?;
        Ok(self.definition.introspect().blocked_reason_in(
            &snapshot.instance.state,
            action,
            &snapshot.instance.context,
        )?)
    }
}
