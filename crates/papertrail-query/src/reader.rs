//! High-level entry point for reading an entity's audit history.

use std::sync::Arc;

use papertrail_core::Auditable;

use crate::collection::AuditEntryCollection;
use crate::entry::AuditEntry;
use crate::error::QueryResult;
use crate::query::AuditQuery;
use crate::store::AuditRecordStore;

/// Audit history grouped by commit cycle, in first-seen hash order.
pub type TransactionTimeline = Vec<(String, AuditEntryCollection)>;

/// Convenience facade over [`AuditQuery`] for entity-centric lookups.
#[derive(Clone)]
pub struct AuditReader {
    store: Arc<dyn AuditRecordStore>,
}

impl AuditReader {
    /// A reader backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AuditRecordStore>) -> Self {
        Self { store }
    }

    /// An unfiltered query to refine further.
    #[must_use]
    pub fn create_query(&self) -> AuditQuery {
        AuditQuery::new(Arc::clone(&self.store))
    }

    /// A query scoped to one entity instance.
    #[must_use]
    pub fn for_entity(&self, class: impl Into<String>, id: impl Into<String>) -> AuditQuery {
        self.create_query().entity(class).entity_id(id)
    }

    /// A query scoped to one user's activity.
    #[must_use]
    pub fn by_user(&self, user_id: i64) -> AuditQuery {
        self.create_query().user(user_id)
    }

    /// A query scoped to one commit cycle.
    #[must_use]
    pub fn by_transaction(&self, hash: impl Into<String>) -> AuditQuery {
        self.create_query().transaction(hash)
    }

    /// Full history of an entity, oldest first.
    ///
    /// An entity without an id has no persisted history yet, so the result
    /// is empty rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn history_for(&self, entity: &dyn Auditable) -> QueryResult<AuditEntryCollection> {
        let Some(id) = entity.entity_id() else {
            return Ok(AuditEntryCollection::empty());
        };
        self.for_entity(entity.entity_class(), id)
            .limit(usize::MAX)
            .results()
    }

    /// Most recent audit entry for an entity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn latest_for(&self, entity: &dyn Auditable) -> QueryResult<Option<AuditEntry>> {
        Ok(self.history_for(entity)?.last().cloned())
    }

    /// Whether any audit record exists for an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn has_history_for(&self, entity: &dyn Auditable) -> QueryResult<bool> {
        let Some(id) = entity.entity_id() else {
            return Ok(false);
        };
        self.for_entity(entity.entity_class(), id).exists()
    }

    /// An entity's history bucketed per commit cycle.
    ///
    /// Buckets appear in the order their transaction hash is first seen,
    /// which for an append-only log is chronological; entries within a
    /// bucket keep their stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn timeline_for(&self, entity: &dyn Auditable) -> QueryResult<TransactionTimeline> {
        let history = self.history_for(entity)?;
        let mut buckets: Vec<(String, Vec<AuditEntry>)> = Vec::new();
        for entry in history.into_vec() {
            let hash = entry.transaction_hash().to_string();
            match buckets.iter_mut().find(|(seen, _)| *seen == hash) {
                Some((_, bucket)) => bucket.push(entry),
                None => buckets.push((hash, vec![entry])),
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(hash, entries)| (hash, AuditEntryCollection::new(entries)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAuditStore;
    use papertrail_core::{Actor, AuditAction, AuditRecord};

    struct Account {
        id: Option<i64>,
    }

    impl Auditable for Account {
        fn entity_class(&self) -> &str {
            "Account"
        }

        fn entity_id(&self) -> Option<String> {
            self.id.map(|id| id.to_string())
        }
    }

    fn seeded_reader() -> AuditReader {
        let store = MemoryAuditStore::new();
        let rows = [
            (AuditAction::Create, "tx1"),
            (AuditAction::Update, "tx2"),
            (AuditAction::Update, "tx2"),
            (AuditAction::SoftDelete, "tx3"),
        ];
        for (action, tx) in rows {
            store
                .insert(AuditRecord::new(
                    "Account",
                    Some("1".to_string()),
                    action,
                    None,
                    None,
                    Vec::new(),
                    Actor::anonymous(),
                    tx,
                ))
                .unwrap();
        }
        AuditReader::new(Arc::new(store))
    }

    #[test]
    fn history_is_oldest_first() {
        let reader = seeded_reader();
        let history = reader.history_for(&Account { id: Some(1) }).unwrap();

        assert_eq!(history.len(), 4);
        assert!(history.first().unwrap().is_create());
        assert!(history.last().unwrap().is_soft_delete());
    }

    #[test]
    fn unpersisted_entity_has_empty_history() {
        let reader = seeded_reader();
        let ghost = Account { id: None };

        assert!(reader.history_for(&ghost).unwrap().is_empty());
        assert!(reader.latest_for(&ghost).unwrap().is_none());
        assert!(!reader.has_history_for(&ghost).unwrap());
    }

    #[test]
    fn latest_is_the_newest_entry() {
        let reader = seeded_reader();
        let latest = reader.latest_for(&Account { id: Some(1) }).unwrap().unwrap();

        assert_eq!(latest.id(), Some(4));
        assert!(latest.is_soft_delete());
    }

    #[test]
    fn has_history_distinguishes_entities() {
        let reader = seeded_reader();
        assert!(reader.has_history_for(&Account { id: Some(1) }).unwrap());
        assert!(!reader.has_history_for(&Account { id: Some(99) }).unwrap());
    }

    #[test]
    fn timeline_groups_by_transaction_in_order() {
        let reader = seeded_reader();
        let timeline = reader.timeline_for(&Account { id: Some(1) }).unwrap();

        let hashes: Vec<&str> = timeline.iter().map(|(hash, _)| hash.as_str()).collect();
        assert_eq!(hashes, vec!["tx1", "tx2", "tx3"]);
        assert_eq!(timeline[1].1.len(), 2);
    }

    #[test]
    fn scoped_query_constructors() {
        let reader = seeded_reader();
        assert_eq!(reader.for_entity("Account", "1").count().unwrap(), 4);
        assert_eq!(reader.by_transaction("tx2").count().unwrap(), 2);
        assert_eq!(reader.by_user(42).count().unwrap(), 0);
        assert_eq!(reader.create_query().count().unwrap(), 4);
    }
}
