//! Field-map normalization and diffing.
//!
//! The generator compares two field maps after normalizing both sides, so
//! that equivalent-but-differently-written values (a timestamp in another
//! offset, a JSON string with different whitespace) produce no diff entry.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::record::FieldMap;

/// Field name excluded from diffs by default. Auto-managed "last modified"
/// columns change on every write and would drown out real changes.
const DEFAULT_EXCLUDED_FIELDS: &[&str] = &["updated_at"];

/// Options controlling diff output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// When `true`, diff values are the structurally normalized native
    /// values. When `false` (the default), values are rendered for display:
    /// timestamps as `"YYYY-MM-DD HH:MM:SS TZ"`, structures as pretty JSON.
    pub raw: bool,
    /// When `false` (the default), excluded timestamp-like fields are left
    /// out of the diff entirely.
    pub include_timestamps: bool,
}

impl DiffOptions {
    /// Options that emit raw normalized values for every field, including
    /// excluded timestamp columns. Used by the capture side to build record
    /// changesets, where the soft-delete marker (itself a timestamp) must
    /// be visible.
    #[must_use]
    pub fn full_raw() -> Self {
        Self {
            raw: true,
            include_timestamps: true,
        }
    }
}

/// The before/after pair for one changed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Value before the mutation.
    pub old: Value,
    /// Value after the mutation.
    pub new: Value,
}

/// An ordered field-to-change mapping, preserving first-encountered key
/// order across both input maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    entries: Vec<(String, FieldChange)>,
}

impl Diff {
    /// Number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the change for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, change)| change)
    }

    /// Whether the diff contains an entry for `field`.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Changed field names, in diff order.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Iterate over `(field, change)` pairs in diff order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.entries
            .iter()
            .map(|(name, change)| (name.as_str(), change))
    }

    fn push(&mut self, field: String, change: FieldChange) {
        self.entries.push((field, change));
    }
}

impl FromIterator<(String, FieldChange)> for Diff {
    fn from_iter<I: IntoIterator<Item = (String, FieldChange)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a (String, FieldChange);
    type IntoIter = std::slice::Iter<'a, (String, FieldChange)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Normalized view of a field value. Equality is variant-sensitive: a
/// temporal value never equals a scalar holding the same text.
#[derive(Debug, Clone, PartialEq)]
enum Normalized {
    /// A value recognized as a point in time, compared as an instant.
    Temporal(DateTime<Utc>),
    /// An object or array, compared structurally.
    Structured(Value),
    /// Anything else, compared as-is.
    Scalar(Value),
}

impl Normalized {
    fn of(value: &Value) -> Self {
        match value {
            Value::String(s) => {
                if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
                    return Self::Temporal(instant.with_timezone(&Utc));
                }
                let trimmed = s.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    // Malformed structured input degrades to the raw string.
                    if let Ok(parsed) = serde_json::from_str::<Value>(s) {
                        return Self::Structured(parsed);
                    }
                }
                Self::Scalar(value.clone())
            },
            Value::Object(_) | Value::Array(_) => Self::Structured(value.clone()),
            _ => Self::Scalar(value.clone()),
        }
    }

    /// Render for diff output.
    fn render(self, raw: bool) -> Value {
        match self {
            Self::Temporal(instant) => {
                if raw {
                    Value::String(instant.to_rfc3339_opts(SecondsFormat::Secs, true))
                } else {
                    Value::String(instant.format("%Y-%m-%d %H:%M:%S %Z").to_string())
                }
            },
            Self::Structured(value) => {
                if raw {
                    value
                } else {
                    // Canonical pretty form; falls back to compact rendering
                    // if pretty serialization is somehow impossible.
                    serde_json::to_string_pretty(&value)
                        .map_or_else(|_| Value::String(value.to_string()), Value::String)
                }
            },
            Self::Scalar(value) => value,
        }
    }
}

/// Normalizes and diffs two field maps.
#[derive(Debug, Clone)]
pub struct DiffGenerator {
    excluded_fields: Vec<String>,
}

impl Default for DiffGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffGenerator {
    /// Generator with the default excluded-field set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            excluded_fields: DEFAULT_EXCLUDED_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Generator excluding the given fields instead of the defaults.
    #[must_use]
    pub fn with_excluded_fields(fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded_fields: fields.into_iter().collect(),
        }
    }

    /// Diff two field maps. `None` maps are treated as empty.
    ///
    /// For every field present in either map, both sides are normalized and
    /// compared with strict equality; equal fields are omitted even when
    /// their raw textual forms differ. A field missing on one side is
    /// compared against null.
    #[must_use]
    pub fn generate(
        &self,
        old: Option<&FieldMap>,
        new: Option<&FieldMap>,
        options: &DiffOptions,
    ) -> Diff {
        let empty = FieldMap::new();
        let old = old.unwrap_or(&empty);
        let new = new.unwrap_or(&empty);

        let mut diff = Diff::default();

        for field in Self::field_union(old, new) {
            if !options.include_timestamps && self.excluded_fields.iter().any(|f| f == field) {
                continue;
            }

            let old_value = old.get(field).unwrap_or(&Value::Null);
            let new_value = new.get(field).unwrap_or(&Value::Null);

            let old_norm = Normalized::of(old_value);
            let new_norm = Normalized::of(new_value);
            if old_norm == new_norm {
                continue;
            }

            diff.push(
                field.clone(),
                FieldChange {
                    old: old_norm.render(options.raw),
                    new: new_norm.render(options.raw),
                },
            );
        }

        diff
    }

    /// Field names from both maps, first-encountered order.
    fn field_union<'a>(old: &'a FieldMap, new: &'a FieldMap) -> Vec<&'a String> {
        let mut fields: Vec<&String> = old.keys().collect();
        for field in new.keys() {
            if !old.contains_key(field) {
                fields.push(field);
            }
        }
        fields
    }
}
