//! Prelude module - commonly used types for convenient import.
//!
//! Use `use papertrail_query::prelude::*;` to import all essential types.

// Errors
pub use crate::{QueryError, QueryResult};

// Query surface
pub use crate::{AuditQuery, AuditReader, TransactionTimeline};

// Read model
pub use crate::{AuditEntry, AuditEntryCollection};

// Storage contract
pub use crate::{AuditRecordStore, MemoryAuditStore, RecordFilters};
