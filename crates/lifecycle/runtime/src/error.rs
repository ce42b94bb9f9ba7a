//! Runtime error types

use lifecycle_types::{EntityId, WorkflowError};
use thiserror::Error;

use crate::store::Version;

/// Errors raised while loading, dispatching or committing lifecycles
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Instance not found: {0}")]
    InstanceNotFound(EntityId),

    #[error("Instance already exists: {0}")]
    InstanceAlreadyExists(EntityId),

    #[error("Concurrent modification of {entity_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        entity_id: EntityId,
        expected: Version,
        actual: Version,
    },

    #[error("Gave up on {entity_id} after {attempts} conflicting attempts")]
    RetriesExhausted { entity_id: EntityId, attempts: u32 },

    #[error("Audit error: {0}")]
    Audit(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl RuntimeError {
    /// Check if reloading and dispatching again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
