//! Versioned snapshot storage
//!
//! Every saved snapshot carries a version. A save names the version it
//! was computed from and fails with `ConcurrentModification` when the
//! stored version has moved on, so two writers can never both commit
//! a transition computed from the same snapshot.

use crate::error::{RuntimeError, RuntimeResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lifecycle_types::{EntityId, WorkflowContext, WorkflowInstance};
use serde::{Deserialize, Serialize};

/// Monotonic snapshot version, starting at 1 on create
pub type Version = u64;

/// A stored instance and its version
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedInstance<C> {
    pub instance: WorkflowInstance<C>,
    pub version: Version,
}

/// Storage backend for lifecycle snapshots
#[async_trait]
pub trait SnapshotStore<C: WorkflowContext>: Send + Sync {
    /// Store a new instance at version 1
    async fn create(&self, instance: WorkflowInstance<C>) -> RuntimeResult<VersionedInstance<C>>;

    /// Load the latest snapshot
    async fn load(&self, entity_id: &EntityId) -> RuntimeResult<Option<VersionedInstance<C>>>;

    /// Replace the snapshot if it is still at `expected`.
    ///
    /// Returns the new version.
    async fn save(&self, instance: WorkflowInstance<C>, expected: Version) -> RuntimeResult<Version>;

    /// All stored snapshots
    async fn list(&self) -> RuntimeResult<Vec<VersionedInstance<C>>>;

    /// Check if an instance exists
    async fn exists(&self, entity_id: &EntityId) -> RuntimeResult<bool> {
        Ok(self.load(entity_id).await?.is_some())
    }
}

/// In-memory snapshot store
pub struct InMemorySnapshotStore<C> {
    snapshots: DashMap<EntityId, VersionedInstance<C>>,
}

impl<C> InMemorySnapshotStore<C> {
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<C> Default for InMemorySnapshotStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: WorkflowContext> SnapshotStore<C> for InMemorySnapshotStore<C> {
    async fn create(&self, instance: WorkflowInstance<C>) -> RuntimeResult<VersionedInstance<C>> {
        match self.snapshots.entry(instance.entity_id.clone()) {
            Entry::Occupied(_) => Err(RuntimeError::InstanceAlreadyExists(instance.entity_id)),
            Entry::Vacant(slot) => {
                let stored = VersionedInstance {
                    instance,
                    version: 1,
                };
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn load(&self, entity_id: &EntityId) -> RuntimeResult<Option<VersionedInstance<C>>> {
        Ok(self.snapshots.get(entity_id).map(|s| s.value().clone()))
    }

    async fn save(&self, instance: WorkflowInstance<C>, expected: Version) -> RuntimeResult<Version> {
        // The shard lock is held for the whole compare-and-swap
        let mut stored = self
            .snapshots
            .get_mut(&instance.entity_id)
            .ok_or_else(|| RuntimeError::InstanceNotFound(instance.entity_id.clone()))?;

        if stored.version != expected {
            return Err(RuntimeError::ConcurrentModification {
                entity_id: instance.entity_id.clone(),
                expected,
                actual: stored.version,
            });
        }

        let version = expected + 1;
        *stored = VersionedInstance { instance, version };
        Ok(version)
    }

    async fn list(&self) -> RuntimeResult<Vec<VersionedInstance<C>>> {
        let mut all: Vec<_> = self.snapshots.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.instance.entity_id.cmp(&b.instance.entity_id));
        Ok(all)
    }
}
