//! The capability trait that opts a domain type into auditing.

/// A domain type that can appear in the audit trail.
///
/// No inheritance hierarchy is required: any type that can name itself and
/// expose its identifier qualifies. Whether instances are actually audited
/// is decided by the capture side's `AuditPolicy` collaborator; this trait
/// only provides the capability surface.
pub trait Auditable {
    /// Fully qualified type name, as stored in `AuditRecord::entity_class`.
    fn entity_class(&self) -> &str;

    /// Stringified identifier, or `None` when the entity has not been
    /// persisted yet (inserts have no id at pre-commit time).
    fn entity_id(&self) -> Option<String>;

    /// Whether this entity is itself an audit record. The coordinator skips
    /// such entities to prevent the trail from auditing its own writes.
    fn is_audit_record(&self) -> bool {
        false
    }
}
