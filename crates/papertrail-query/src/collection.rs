//! Ordered collections of audit entries with grouping and filtering algebra.

use std::collections::BTreeMap;

use papertrail_core::AuditAction;

use crate::entry::AuditEntry;

/// An ordered sequence of [`AuditEntry`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditEntryCollection {
    entries: Vec<AuditEntry>,
}

impl AuditEntryCollection {
    /// Wrap a sequence of entries, preserving order.
    #[must_use]
    pub fn new(entries: Vec<AuditEntry>) -> Self {
        Self { entries }
    }

    /// An empty collection.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry, or `None` when empty.
    #[must_use]
    pub fn first(&self) -> Option<&AuditEntry> {
        self.entries.first()
    }

    /// Last entry, or `None` when empty.
    #[must_use]
    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// Entries matching the predicate, in original order.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&AuditEntry) -> bool) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| predicate(entry))
                .cloned()
                .collect(),
        }
    }

    /// Apply `f` to every entry, in order.
    pub fn map<T>(&self, f: impl Fn(&AuditEntry) -> T) -> Vec<T> {
        self.entries.iter().map(f).collect()
    }

    /// Partition entries by action. Every entry lands in exactly one group.
    #[must_use]
    pub fn group_by_action(&self) -> BTreeMap<AuditAction, Self> {
        let mut groups: BTreeMap<AuditAction, Self> = BTreeMap::new();
        for entry in &self.entries {
            groups
                .entry(entry.action())
                .or_default()
                .entries
                .push(entry.clone());
        }
        groups
    }

    /// Partition entries by entity class. Every entry lands in exactly one
    /// group.
    #[must_use]
    pub fn group_by_entity(&self) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<String, Self> = BTreeMap::new();
        for entry in &self.entries {
            groups
                .entry(entry.entity_class().to_string())
                .or_default()
                .entries
                .push(entry.clone());
        }
        groups
    }

    /// Entries recording creates.
    #[must_use]
    pub fn creates(&self) -> Self {
        self.filter(AuditEntry::is_create)
    }

    /// Entries recording updates.
    #[must_use]
    pub fn updates(&self) -> Self {
        self.filter(AuditEntry::is_update)
    }

    /// Entries recording deletions, soft deletes included.
    #[must_use]
    pub fn deletes(&self) -> Self {
        self.filter(|entry| entry.is_delete() || entry.is_soft_delete())
    }

    /// The entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Consume the collection, returning its entries.
    #[must_use]
    pub fn into_vec(self) -> Vec<AuditEntry> {
        self.entries
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for AuditEntryCollection {
    type Item = AuditEntry;
    type IntoIter = std::vec::IntoIter<AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AuditEntryCollection {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<AuditEntry> for AuditEntryCollection {
    fn from_iter<I: IntoIterator<Item = AuditEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
