//! Immutable audit record model.
//!
//! An [`AuditRecord`] describes one classified mutation of one entity within
//! one commit cycle. Records are created by the change-capture coordinator,
//! persisted by a storage collaborator, and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Auditable;

/// Ordered map of field name to field value.
///
/// `serde_json::Map` is built with `preserve_order`, so iteration follows
/// insertion order. Changesets and diffs rely on this.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Classification of a captured mutation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A new entity was inserted.
    Create,
    /// An existing entity was modified.
    Update,
    /// An entity was removed from storage.
    Delete,
    /// A scheduled deletion was intercepted and converted into a
    /// deletion-marker update.
    SoftDelete,
    /// A soft-deleted entity had its deletion marker cleared.
    Restore,
}

impl AuditAction {
    /// Stable string form, matching the serialized representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::SoftDelete => "soft_delete",
            Self::Restore => "restore",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed the mutation, as resolved at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user id, if any.
    pub user_id: Option<i64>,
    /// Display name of the user.
    pub username: Option<String>,
    /// Remote address the mutation originated from.
    pub ip_address: Option<String>,
}

impl Actor {
    /// An anonymous actor with no identity attached.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// A single immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Storage-assigned id. `None` until the record is persisted.
    pub id: Option<i64>,
    /// Fully qualified type name of the audited entity.
    pub entity_class: String,
    /// Identifier of the audited entity. Only guaranteed present at
    /// post-commit delivery; inserts have no id at pre-commit time.
    pub entity_id: Option<String>,
    /// Classified action.
    pub action: AuditAction,
    /// Field values before the mutation. `None` for creates.
    pub old_values: Option<FieldMap>,
    /// Field values after the mutation. `None` for hard deletes.
    pub new_values: Option<FieldMap>,
    /// Names of the fields whose normalized values differ between
    /// `old_values` and `new_values`.
    pub changed_fields: Vec<String>,
    /// Authenticated user id of the actor.
    pub user_id: Option<i64>,
    /// Display name of the actor.
    pub username: Option<String>,
    /// Remote address of the actor.
    pub ip_address: Option<String>,
    /// Opaque key grouping all records produced within one commit cycle.
    pub transaction_hash: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a new, unpersisted record.
    ///
    /// `changed_fields` is derived from the value maps: for updates it is
    /// the set of differing keys, for creates every new key, for deletes
    /// every old key.
    #[must_use]
    pub fn new(
        entity_class: impl Into<String>,
        entity_id: Option<String>,
        action: AuditAction,
        old_values: Option<FieldMap>,
        new_values: Option<FieldMap>,
        changed_fields: Vec<String>,
        actor: Actor,
        transaction_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            entity_class: entity_class.into(),
            entity_id,
            action,
            old_values,
            new_values,
            changed_fields,
            user_id: actor.user_id,
            username: actor.username,
            ip_address: actor.ip_address,
            transaction_hash: transaction_hash.into(),
            created_at: Utc::now(),
        }
    }

    /// Copy of this record with a storage-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

// Audit records pass through the same unit-of-work machinery as domain
// entities, so they answer the capability trait themselves. The capture
// side uses `is_audit_record` to stop recursive self-auditing.
impl Auditable for AuditRecord {
    fn entity_class(&self) -> &str {
        "papertrail::AuditRecord"
    }

    fn entity_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn is_audit_record(&self) -> bool {
        true
    }
}
