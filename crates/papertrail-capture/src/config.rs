//! Capture configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the change-capture coordinator, fixed for its lifetime.
///
/// Deserializable from a TOML section; every field defaults so a bare
/// `[capture]` header produces a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Record SOFT_DELETE and RESTORE actions for intercepted deletions and
    /// cleared deletion markers.
    pub enable_soft_delete: bool,
    /// Record DELETE actions for true hard deletes.
    pub enable_hard_delete: bool,
    /// Name of the deletion-marker field a competing soft-delete mechanism
    /// sets. A non-null to null transition of this field is a restore.
    pub soft_delete_field: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enable_soft_delete: true,
            enable_hard_delete: true,
            soft_delete_field: "deleted_at".to_string(),
        }
    }
}
