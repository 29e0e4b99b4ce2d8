//! Capture-side error types.

use thiserror::Error;

/// Errors that can occur while capturing and delivering audit records.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A transport refused or failed a delivery. Propagates out of the
    /// commit hooks and aborts the enclosing transaction.
    #[error("transport delivery failed: {0}")]
    Transport(String),

    /// The persistence layer failed to register or commit a record.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
