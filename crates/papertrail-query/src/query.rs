//! Immutable fluent query builder over the audit trail.
//!
//! Keyset (cursor) pagination is used instead of offset pagination: a range
//! scan bounded by the last-seen id stays indexed and stable on a large,
//! append-only log, where offsets would pay a growing skip cost and drift
//! as new records arrive.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use papertrail_core::AuditAction;

use crate::collection::AuditEntryCollection;
use crate::entry::AuditEntry;
use crate::error::QueryResult;
use crate::store::{AuditRecordStore, RecordFilters};

const DEFAULT_LIMIT: usize = 30;

/// An immutable filter/pagination specification.
///
/// Every mutator returns a new instance with exactly one logical change;
/// the receiver is never modified, and derived instances share no mutable
/// state. Execute with [`results`](Self::results), [`count`](Self::count),
/// or [`first_result`](Self::first_result).
#[derive(Clone)]
pub struct AuditQuery {
    store: Arc<dyn AuditRecordStore>,
    entity_class: Option<String>,
    entity_id: Option<String>,
    actions: Vec<AuditAction>,
    user_id: Option<i64>,
    transaction_hash: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    changed_fields: Vec<String>,
    limit: usize,
    after_id: Option<i64>,
    before_id: Option<i64>,
}

impl AuditQuery {
    /// An unfiltered query with the default limit.
    #[must_use]
    pub fn new(store: Arc<dyn AuditRecordStore>) -> Self {
        Self {
            store,
            entity_class: None,
            entity_id: None,
            actions: Vec::new(),
            user_id: None,
            transaction_hash: None,
            since: None,
            until: None,
            changed_fields: Vec::new(),
            limit: DEFAULT_LIMIT,
            after_id: None,
            before_id: None,
        }
    }

    /// Filter by entity class. Resets any entity-id filter, since an id is
    /// meaningless under a different class.
    #[must_use]
    pub fn entity(&self, class: impl Into<String>) -> Self {
        Self {
            entity_class: Some(class.into()),
            entity_id: None,
            ..self.clone()
        }
    }

    /// Filter by entity id (combine with [`entity`](Self::entity)).
    #[must_use]
    pub fn entity_id(&self, id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(id.into()),
            ..self.clone()
        }
    }

    /// Filter by one or more action types, replacing any previous list.
    #[must_use]
    pub fn action(&self, actions: impl IntoIterator<Item = AuditAction>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Filter for create actions only.
    #[must_use]
    pub fn creates(&self) -> Self {
        self.action([AuditAction::Create])
    }

    /// Filter for update actions only.
    #[must_use]
    pub fn updates(&self) -> Self {
        self.action([AuditAction::Update])
    }

    /// Filter for deletions, soft deletes included.
    #[must_use]
    pub fn deletes(&self) -> Self {
        self.action([AuditAction::Delete, AuditAction::SoftDelete])
    }

    /// Filter by user id.
    #[must_use]
    pub fn user(&self, user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..self.clone()
        }
    }

    /// Filter by transaction hash.
    #[must_use]
    pub fn transaction(&self, hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: Some(hash.into()),
            ..self.clone()
        }
    }

    /// Filter for records created on or after the given time.
    #[must_use]
    pub fn since(&self, from: DateTime<Utc>) -> Self {
        Self {
            since: Some(from),
            ..self.clone()
        }
    }

    /// Filter for records created on or before the given time.
    #[must_use]
    pub fn until(&self, to: DateTime<Utc>) -> Self {
        Self {
            until: Some(to),
            ..self.clone()
        }
    }

    /// Filter for records within an inclusive time range.
    #[must_use]
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.since(from).until(to)
    }

    /// Filter for records that changed any of the given fields (OR
    /// semantics), replacing any previous list.
    #[must_use]
    pub fn changed_field(
        &self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            changed_fields: fields.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    /// Limit the number of results.
    #[must_use]
    pub fn limit(&self, limit: usize) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    /// Keyset pagination: results strictly after the given id ("next
    /// page"). Clears any descending cursor.
    #[must_use]
    pub fn after(&self, id: i64) -> Self {
        Self {
            after_id: Some(id),
            before_id: None,
            ..self.clone()
        }
    }

    /// Keyset pagination: results strictly before the given id ("previous
    /// page"). Clears any ascending cursor.
    #[must_use]
    pub fn before(&self, id: i64) -> Self {
        Self {
            after_id: None,
            before_id: Some(id),
            ..self.clone()
        }
    }

    /// Execute the query.
    ///
    /// The store performs the indexed range scan; the changed-fields filter
    /// is applied in-process afterwards because the store cannot evaluate
    /// it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn results(&self) -> QueryResult<AuditEntryCollection> {
        let mut records = self.store.find_with_filters(&self.filters(), self.limit)?;

        if !self.changed_fields.is_empty() {
            records.retain(|record| {
                record
                    .changed_fields
                    .iter()
                    .any(|field| self.changed_fields.contains(field))
            });
        }

        Ok(records.into_iter().map(AuditEntry::new).collect())
    }

    /// Count matching records.
    ///
    /// Under a changed-fields filter no bounded fetch can count accurately,
    /// so the full result set is materialized with limit and cursors
    /// dropped, trading efficiency for accuracy. Otherwise the count
    /// delegates to the store with cursors removed, since pagination bounds
    /// are meaningless for a total.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn count(&self) -> QueryResult<usize> {
        if !self.changed_fields.is_empty() {
            let unbounded = Self {
                limit: usize::MAX,
                after_id: None,
                before_id: None,
                ..self.clone()
            };
            return Ok(unbounded.results()?.len());
        }

        let mut filters = self.filters();
        filters.after_id = None;
        filters.before_id = None;
        Ok(self.store.find_with_filters(&filters, usize::MAX)?.len())
    }

    /// First matching entry, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn first_result(&self) -> QueryResult<Option<AuditEntry>> {
        Ok(self.limit(1).results()?.first().cloned())
    }

    /// Whether any record matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn exists(&self) -> QueryResult<bool> {
        Ok(self.first_result()?.is_some())
    }

    /// Id of the last entry of the current page, to feed into
    /// [`after`](Self::after) for the next page. `None` signals the end of
    /// pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn next_cursor(&self) -> QueryResult<Option<i64>> {
        Ok(self.results()?.last().and_then(AuditEntry::id))
    }

    fn filters(&self) -> RecordFilters {
        RecordFilters {
            entity_class: self.entity_class.clone(),
            entity_id: self.entity_id.clone(),
            actions: self.actions.clone(),
            user_id: self.user_id,
            transaction_hash: self.transaction_hash.clone(),
            from: self.since,
            to: self.until,
            after_id: self.after_id,
            before_id: self.before_id,
        }
    }
}
