//! Lifecycle Runtime
//!
//! The host side of the lifecycle engine. The engine computes
//! transitions; this crate stores the results and serializes writers.
//!
//! - [`SnapshotStore`]: versioned snapshots with compare-and-swap saves
//! - [`AuditSink`]: where committed transition records go
//! - [`Dispatcher`]: load, interpret, commit, retry on stale snapshots
//! - [`RuntimeConfig`]: layered configuration (defaults, file, env)

#![deny(unsafe_code)]

pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod store;

pub use audit::{AuditSink, InMemoryAuditLog, TracingAuditSink};
pub use config::{DeliverableDefaults, DispatchConfig, LoggingConfig, RuntimeConfig};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{RuntimeError, RuntimeResult};
pub use store::{InMemorySnapshotStore, SnapshotStore, Version, VersionedInstance};
