//! Unified error handling for fpbridge
//!
//! A single error type shared by the hardware locator, the property stores,
//! the configuration loader and the session admission path.

use std::io;
use std::path::PathBuf;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type for all fpbridge operations
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    // ============================================================================
    // Hardware Module Errors
    // ============================================================================
    #[error("Can't open HW module {id} (class {class}), error: {code}")]
    ModuleNotFound {
        id: String,
        class: String,
        code: i32,
    },

    #[error("No valid open method in module {0}")]
    NoOpenMethod(String),

    #[error("Can't open fingerprint methods, error: {0}")]
    OpenFailed(i32),

    #[error("Wrong fingerprint HAL version: expected {expected:#06x}, got {actual:#06x}")]
    VersionMismatch {
        expected: u32,
        actual: u32,
    },

    #[error("Can't register fingerprint module callback, error: {0}")]
    NotifyRegistration(i32),

    #[error("Can't close fingerprint module, error: {0}")]
    CloseFailed(i32),

    #[error("No fingerprint device available")]
    NoDevice,

    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Open session already exists")]
    SessionBusy,

    #[error("Remote peer is dead")]
    DeadPeer,

    // ============================================================================
    // Configuration and Property Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

impl BridgeError {
    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a module resolution error, rendering a missing class as "(null)"
    pub fn module_not_found(id: &str, class: Option<&str>, code: i32) -> Self {
        Self::ModuleNotFound {
            id: id.to_string(),
            class: class.unwrap_or("(null)").to_string(),
            code,
        }
    }

    /// Whether the locator should give up on the current candidate for a
    /// build-configuration reason rather than a missing module.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }
}
