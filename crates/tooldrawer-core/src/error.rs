//! Error types for tooldrawer-core

use thiserror::Error;

/// Result type alias for tooldrawer-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tooldrawer-core
///
/// Request-time rejections from the ops and overlay engines are not errors:
/// they are reported as [`crate::ops::OpsResult::Rejected`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Malformed normalization rules on a widget definition
    #[error("invalid normalization: {message}")]
    InvalidNormalization {
        /// Description of the offending rule
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
