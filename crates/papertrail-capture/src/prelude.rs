//! Prelude module - commonly used types for convenient import.
//!
//! Use `use papertrail_capture::prelude::*;` to import all essential types.

// Errors
pub use crate::{CaptureError, CaptureResult};

// Collaborator contracts
pub use crate::{
    ActorResolver, AuditPolicy, AuditTransport, CommitPhase, DeliveryContext, FieldTransition,
    UnitOfWork,
};

// Coordinator and configuration
pub use crate::{CaptureConfig, ChangeCaptureCoordinator};
