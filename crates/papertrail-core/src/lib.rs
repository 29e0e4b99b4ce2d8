//! Papertrail Core - Audit record model and field diffing.
//!
//! This crate provides:
//! - The immutable [`AuditRecord`] read/write model and its [`AuditAction`]
//!   classification
//! - The [`Auditable`] capability trait that opts a domain type into auditing
//! - The [`DiffGenerator`] that normalizes and compares field maps
//!
//! Records are created by the capture side (`papertrail-capture`) during a
//! commit cycle and read back through the query side (`papertrail-query`).
//! They are never mutated after creation and never deleted.
//!
//! # Example
//!
//! ```
//! use papertrail_core::{DiffGenerator, DiffOptions, FieldMap};
//! use serde_json::json;
//!
//! let generator = DiffGenerator::new();
//!
//! let mut old = FieldMap::new();
//! old.insert("name".to_string(), json!("John"));
//! old.insert("age".to_string(), json!(30));
//!
//! let mut new = FieldMap::new();
//! new.insert("name".to_string(), json!("Jane"));
//! new.insert("age".to_string(), json!(30));
//!
//! let diff = generator.generate(Some(&old), Some(&new), &DiffOptions::default());
//!
//! // Only `name` changed; `age` is a no-op and is omitted.
//! assert_eq!(diff.len(), 1);
//! assert!(diff.contains_field("name"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod diff;
mod entity;
mod record;

pub use diff::{Diff, DiffGenerator, DiffOptions, FieldChange};
pub use entity::Auditable;
pub use record::{Actor, AuditAction, AuditRecord, FieldMap};
