//! Papertrail Capture - Two-phase change capture.
//!
//! This crate hooks a transactional persistence layer's commit lifecycle and
//! synthesizes immutable audit records from the mutations it observes:
//!
//! - [`ChangeCaptureCoordinator`] classifies insertions, updates, deletions,
//!   soft deletions, and restores across a pre-commit and a post-commit phase
//! - [`UnitOfWork`], [`AuditTransport`], [`AuditPolicy`] and [`ActorResolver`]
//!   are the collaborator seams the host wires in
//! - [`CaptureConfig`] holds the soft/hard delete switches and the
//!   soft-delete marker field
//!
//! # Failure model
//!
//! Delivery failures propagate out of the commit hooks uncaught: an
//! incomplete audit trail is treated as worse than a rolled-back business
//! operation. Internal queues are drained before delivery starts, so a
//! retried commit never sees stale entries.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod config;
mod contract;
mod coordinator;
mod error;

pub use config::CaptureConfig;
pub use contract::{
    ActorResolver, AuditPolicy, AuditTransport, CommitPhase, DeliveryContext, FieldTransition,
    UnitOfWork,
};
pub use coordinator::ChangeCaptureCoordinator;
pub use error::{CaptureError, CaptureResult};
