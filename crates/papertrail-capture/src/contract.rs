//! Collaborator contracts consumed by the coordinator.
//!
//! The capture core does not know how entities are stored, how records are
//! delivered, or how auditability is declared. It consumes these seams; the
//! host wires in implementations.

use std::sync::Arc;

use papertrail_core::{Actor, AuditRecord, Auditable, FieldMap};
use serde_json::Value;
use serde::{Deserialize, Serialize};

use crate::error::CaptureResult;

/// The two points of the commit lifecycle the coordinator hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPhase {
    /// Pending mutations are known but not yet durably written.
    PreCommit,
    /// Mutations are durable; generated identifiers and final tracked
    /// status are available.
    PostCommit,
}

impl std::fmt::Display for CommitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreCommit => f.write_str("pre-commit"),
            Self::PostCommit => f.write_str("post-commit"),
        }
    }
}

/// One field-level transition within an update changeset.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTransition {
    /// Field name.
    pub field: String,
    /// Value before the update.
    pub old: Value,
    /// Value after the update.
    pub new: Value,
}

impl FieldTransition {
    /// Convenience constructor.
    #[must_use]
    pub fn new(field: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            field: field.into(),
            old,
            new,
        }
    }
}

/// Context handed to a transport alongside each record.
pub struct DeliveryContext<'a> {
    /// Which phase produced this delivery.
    pub phase: CommitPhase,
    /// The live entity the record describes, when available. At post-commit
    /// time this carries generated identifiers the record itself may lack.
    pub entity: Option<&'a dyn Auditable>,
    /// Handle to the in-flight unit of work.
    pub uow: &'a dyn UnitOfWork,
}

/// View of the persistence layer's in-flight commit.
///
/// All methods are synchronous; the coordinator is bound to the caller's
/// commit cycle and performs no background work.
pub trait UnitOfWork {
    /// Entities scheduled for insertion, in scheduling order.
    fn scheduled_insertions(&self) -> Vec<Arc<dyn Auditable>>;

    /// Entities scheduled for update, in scheduling order.
    fn scheduled_updates(&self) -> Vec<Arc<dyn Auditable>>;

    /// Entities scheduled for deletion, in scheduling order.
    fn scheduled_deletions(&self) -> Vec<Arc<dyn Auditable>>;

    /// Field-level changeset for an entity scheduled for update.
    fn change_set(&self, entity: &dyn Auditable) -> Vec<FieldTransition>;

    /// Full field snapshot of an entity's current state.
    fn snapshot(&self, entity: &dyn Auditable) -> FieldMap;

    /// Whether the entity is still tracked by the persistence layer.
    /// Observed post-commit to classify deferred deletions.
    fn contains(&self, entity: &dyn Auditable) -> bool;

    /// Register a new audit record for write. Pre-commit records ride the
    /// main commit; post-commit records need the secondary commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be queued for persistence.
    fn register(&self, record: &AuditRecord) -> CaptureResult<()>;

    /// Trigger a commit so registered records become durable. Called by the
    /// coordinator exactly once per cycle, under its reentrancy guard.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&self) -> CaptureResult<()>;
}

/// Delivery seam for produced records.
pub trait AuditTransport {
    /// Deliver one record. Failures are opaque to the coordinator and
    /// propagate out of the enclosing commit.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    fn send(&self, record: &AuditRecord, context: &DeliveryContext<'_>) -> CaptureResult<()>;

    /// Whether this transport participates in the given phase. Deliveries
    /// for unsupported phases are skipped, not failed.
    fn supports(&self, phase: CommitPhase) -> bool {
        let _ = phase;
        true
    }
}

/// Decides which entities are in scope for auditing.
pub trait AuditPolicy {
    /// Whether the given entity instance should be audited.
    fn should_audit(&self, entity: &dyn Auditable) -> bool;
}

/// Resolves the actor responsible for the current mutation.
pub trait ActorResolver {
    /// The current actor. Implementations typically read an authentication
    /// context and the current request's remote address.
    fn current_actor(&self) -> Actor;
}
