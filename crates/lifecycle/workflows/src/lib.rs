//! Lifecycle Workflows
//!
//! The two concrete lifecycles built on the engine:
//!
//! - [`deliverable`]: work → review → approval → delivery, with a bounded
//!   number of revision rounds and a payment gate on delivery.
//! - [`project`]: pending → active → completed → archived, gated on the
//!   contract, the initial payment, finished deliverables and the final
//!   payment.
//!
//! Each module exposes its state, event, guard and action names as
//! constants, its context type, and a `definition()` constructor that
//! returns the validated [`WorkflowDefinition`].

#![deny(unsafe_code)]

pub mod deliverable;
pub mod project;

pub use deliverable::{DeliverableContext, DEFAULT_MAX_REVISIONS};
pub use project::ProjectContext;

use lifecycle_engine::WorkflowDefinition;
use lifecycle_types::{EntityKind, WorkflowResult, WorkflowTable};

/// The declarative table for an entity kind
pub fn table_for(kind: EntityKind) -> WorkflowResult<WorkflowTable> {
    match kind {
        EntityKind::Deliverable => deliverable::table(),
        EntityKind::Project => project::table(),
    }
}

/// Both validated definitions, built once for a host to share
#[derive(Clone, Debug)]
pub struct Workflows {
    pub deliverable: WorkflowDefinition<DeliverableContext>,
    pub project: WorkflowDefinition<ProjectContext>,
}

impl Workflows {
    pub fn load() -> WorkflowResult<Self> {
        Ok(Self {
            deliverable: deliverable::definition()?,
            project: project::definition()?,
        })
    }
}
