//! Prelude module - commonly used types for convenient import.
//!
//! Use `use papertrail_core::prelude::*;` to import all essential types.

// Record model
pub use crate::{Actor, AuditAction, AuditRecord, FieldMap};

// Capability trait
pub use crate::Auditable;

// Diffing
pub use crate::{Diff, DiffGenerator, DiffOptions, FieldChange};
