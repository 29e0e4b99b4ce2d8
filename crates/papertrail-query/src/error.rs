//! Query-side error types.

use thiserror::Error;

/// Errors that can occur while reading the audit trail.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The record store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
