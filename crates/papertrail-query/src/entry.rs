//! Typed read-model view over a stored audit record.

use chrono::{DateTime, Utc};
use papertrail_core::{AuditAction, AuditRecord, Diff, FieldChange, FieldMap};
use serde_json::Value;

/// A typed wrapper around one stored [`AuditRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    record: AuditRecord,
}

impl AuditEntry {
    /// Wrap a stored record.
    #[must_use]
    pub fn new(record: AuditRecord) -> Self {
        Self { record }
    }

    /// Storage-assigned id.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.record.id
    }

    /// Fully qualified entity type name.
    #[must_use]
    pub fn entity_class(&self) -> &str {
        &self.record.entity_class
    }

    /// Entity type name with any namespace or module prefix stripped.
    #[must_use]
    pub fn entity_short_name(&self) -> &str {
        let class = &self.record.entity_class;
        let class = class.rsplit("::").next().unwrap_or(class);
        class.rsplit('\\').next().unwrap_or(class)
    }

    /// Audited entity id.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.record.entity_id.as_deref()
    }

    /// Classified action.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.record.action
    }

    /// Whether this entry records a create.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.record.action == AuditAction::Create
    }

    /// Whether this entry records an update.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.record.action == AuditAction::Update
    }

    /// Whether this entry records a hard delete.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.record.action == AuditAction::Delete
    }

    /// Whether this entry records a soft delete.
    #[must_use]
    pub fn is_soft_delete(&self) -> bool {
        self.record.action == AuditAction::SoftDelete
    }

    /// Whether this entry records a restore.
    #[must_use]
    pub fn is_restore(&self) -> bool {
        self.record.action == AuditAction::Restore
    }

    /// Actor user id.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.record.user_id
    }

    /// Actor display name.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.record.username.as_deref()
    }

    /// Actor remote address.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.record.ip_address.as_deref()
    }

    /// Commit-cycle grouping key.
    #[must_use]
    pub fn transaction_hash(&self) -> &str {
        &self.record.transaction_hash
    }

    /// When the record was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    /// Field values before the mutation.
    #[must_use]
    pub fn old_values(&self) -> Option<&FieldMap> {
        self.record.old_values.as_ref()
    }

    /// Field values after the mutation.
    #[must_use]
    pub fn new_values(&self) -> Option<&FieldMap> {
        self.record.new_values.as_ref()
    }

    /// Names of the changed fields.
    #[must_use]
    pub fn changed_fields(&self) -> &[String] {
        &self.record.changed_fields
    }

    /// Whether the given field changed in this entry.
    #[must_use]
    pub fn has_field_changed(&self, field: &str) -> bool {
        self.record.changed_fields.iter().any(|f| f == field)
    }

    /// Before/after pairs for every changed field, built from the stored
    /// value maps. A side missing a field is reported as null.
    #[must_use]
    pub fn diff(&self) -> Diff {
        self.record
            .changed_fields
            .iter()
            .map(|field| {
                (
                    field.clone(),
                    FieldChange {
                        old: self.stored_value(self.record.old_values.as_ref(), field),
                        new: self.stored_value(self.record.new_values.as_ref(), field),
                    },
                )
            })
            .collect()
    }

    /// Pre-mutation value of a field, if recorded.
    #[must_use]
    pub fn old_value(&self, field: &str) -> Option<&Value> {
        self.record.old_values.as_ref().and_then(|map| map.get(field))
    }

    /// Post-mutation value of a field, if recorded.
    #[must_use]
    pub fn new_value(&self, field: &str) -> Option<&Value> {
        self.record.new_values.as_ref().and_then(|map| map.get(field))
    }

    /// The underlying stored record.
    #[must_use]
    pub fn record(&self) -> &AuditRecord {
        &self.record
    }

    /// Consume the entry, returning the stored record.
    #[must_use]
    pub fn into_record(self) -> AuditRecord {
        self.record
    }

    #[allow(clippy::unused_self)]
    fn stored_value(&self, map: Option<&FieldMap>, field: &str) -> Value {
        map.and_then(|map| map.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    }
}
