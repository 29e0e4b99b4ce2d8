//! Read-side record store contract and in-memory reference implementation.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use papertrail_core::{AuditAction, AuditRecord};
use tracing::trace;

use crate::error::{QueryError, QueryResult};

/// Filter descriptor handed to the store by [`AuditQuery`].
///
/// [`AuditQuery`]: crate::AuditQuery
#[derive(Debug, Clone, Default)]
pub struct RecordFilters {
    /// Match records for this entity class.
    pub entity_class: Option<String>,
    /// Match records for this entity id.
    pub entity_id: Option<String>,
    /// Match records whose action is any of these. Empty matches all.
    pub actions: Vec<AuditAction>,
    /// Match records produced by this user.
    pub user_id: Option<i64>,
    /// Match records from this commit cycle.
    pub transaction_hash: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Exclusive keyset cursor: only ids strictly greater.
    pub after_id: Option<i64>,
    /// Exclusive keyset cursor: only ids strictly less.
    pub before_id: Option<i64>,
}

impl RecordFilters {
    fn matches(&self, record: &AuditRecord) -> bool {
        let Some(id) = record.id else {
            return false;
        };
        if self.after_id.is_some_and(|cursor| id <= cursor) {
            return false;
        }
        if self.before_id.is_some_and(|cursor| id >= cursor) {
            return false;
        }
        if self
            .entity_class
            .as_ref()
            .is_some_and(|class| *class != record.entity_class)
        {
            return false;
        }
        if self.entity_id.is_some() && self.entity_id != record.entity_id {
            return false;
        }
        if !self.actions.is_empty() && !self.actions.contains(&record.action) {
            return false;
        }
        if self.user_id.is_some() && self.user_id != record.user_id {
            return false;
        }
        if self
            .transaction_hash
            .as_ref()
            .is_some_and(|hash| *hash != record.transaction_hash)
        {
            return false;
        }
        if self.from.is_some_and(|from| record.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.created_at > to) {
            return false;
        }
        true
    }
}

/// Read-side store contract.
///
/// Implementations return records sorted ascending by primary key and apply
/// cursor bounds as strict exclusive inequalities. They cannot evaluate
/// changed-field predicates; that filtering happens in the query layer.
pub trait AuditRecordStore: Send + Sync {
    /// Indexed range scan honoring `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn find_with_filters(
        &self,
        filters: &RecordFilters,
        limit: usize,
    ) -> QueryResult<Vec<AuditRecord>>;

    /// Look up a single record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find(&self, id: i64) -> QueryResult<Option<AuditRecord>>;
}

/// Thread-safe in-memory record store.
///
/// Assigns ids on insert and keeps records in id order. Used as the
/// reference implementation in tests and for embedding without a database.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a record, assigning the next id. Returns the assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert(&self, record: AuditRecord) -> QueryResult<i64> {
        let mut records = self
            .records
            .write()
            .map_err(|_| QueryError::Storage("store lock poisoned".to_string()))?;
        let id = records
            .last()
            .and_then(|record| record.id)
            .unwrap_or(0)
            .saturating_add(1);
        trace!(id, entity_class = %record.entity_class, "stored audit record");
        records.push(record.with_id(id));
        Ok(id)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn len(&self) -> QueryResult<usize> {
        Ok(self
            .records
            .read()
            .map_err(|_| QueryError::Storage("store lock poisoned".to_string()))?
            .len())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn is_empty(&self) -> QueryResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl AuditRecordStore for MemoryAuditStore {
    fn find_with_filters(
        &self,
        filters: &RecordFilters,
        limit: usize,
    ) -> QueryResult<Vec<AuditRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| QueryError::Storage("store lock poisoned".to_string()))?;
        // Insertion order is id order.
        Ok(records
            .iter()
            .filter(|record| filters.matches(record))
            .take(limit)
            .cloned()
            .collect())
    }

    fn find(&self, id: i64) -> QueryResult<Option<AuditRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| QueryError::Storage("store lock poisoned".to_string()))?;
        Ok(records.iter().find(|record| record.id == Some(id)).cloned())
    }
}
