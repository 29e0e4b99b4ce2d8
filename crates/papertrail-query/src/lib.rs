//! Papertrail Query - Read API over the accumulated audit trail.
//!
//! This crate provides:
//! - [`AuditQuery`], an immutable fluent filter/pagination builder using
//!   keyset (cursor) pagination
//! - [`AuditReader`], a facade with convenience entry points
//! - [`AuditEntry`] and [`AuditEntryCollection`], typed read-model views
//!   over stored records
//! - The [`AuditRecordStore`] read contract and [`MemoryAuditStore`], an
//!   in-memory reference implementation
//!
//! The read side operates only on already-stored records and never mutates
//! them.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod collection;
mod entry;
mod error;
mod query;
mod reader;
mod store;

pub use collection::AuditEntryCollection;
pub use entry::AuditEntry;
pub use error::{QueryError, QueryResult};
pub use query::AuditQuery;
pub use reader::{AuditReader, TransactionTimeline};
pub use store::{AuditRecordStore, MemoryAuditStore, RecordFilters};
