//! Error types for widget compilation

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling a widget definition
///
/// All of these are build-time failures meant for the widget author; each
/// names the control path or markup construct at fault.
#[derive(Error, Debug)]
pub enum Error {
    /// A required top-level field of the widget definition is missing
    #[error("widget JSON missing {field}")]
    MissingField {
        /// Field name and expected shape
        field: String,
    },

    /// The markup declares no panels
    #[error("no <bob-panel> definitions found in widget markup")]
    NoPanels,

    /// No kind could be inferred for a control
    #[error("control \"{path}\" is missing kind metadata")]
    UnresolvedKind {
        /// Control path pattern
        path: String,
    },

    /// Inline `options` attribute is malformed
    #[error("invalid options for control \"{path}\": {message}")]
    InvalidOptions {
        /// Control path pattern, or component type for path-less tags
        path: String,
        /// What is wrong with the options
        message: String,
    },

    /// A layout attribute the editor does not support
    #[error("<tooldrawer-cluster> does not support {attribute}; use the stack gap and fixed cluster gap")]
    DisallowedLayout {
        /// Offending attribute
        attribute: String,
    },

    /// No stencil exists for a component type
    #[error("missing stencil for component {component} at {location}")]
    MissingStencil {
        /// Component type
        component: String,
        /// Where the stencil was looked up
        location: String,
    },

    /// A component's `.spec.json` could not be read
    #[error("invalid spec for component {component}: {message}")]
    InvalidComponentSpec {
        /// Component type
        component: String,
        /// Parse error
        message: String,
    },

    /// Malformed normalization rules
    #[error("invalid normalization: {message}")]
    InvalidNormalization {
        /// Description of the offending rule
        message: String,
    },

    /// The widget's own defaults violate its compiled controls
    #[error("defaults are invalid at \"{path}\": {message}")]
    InvalidDefaults {
        /// Concrete data path
        path: String,
        /// Validation message
        message: String,
    },

    /// The widget definition is not a JSON object
    #[error("invalid widget JSON: {message}")]
    InvalidWidgetJson {
        /// Parse error or shape problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tooldrawer_core::Error> for Error {
    fn from(err: tooldrawer_core::Error) -> Self {
        match err {
            tooldrawer_core::Error::InvalidNormalization { message } => {
                Error::InvalidNormalization { message }
            }
            tooldrawer_core::Error::Io(e) => Error::Io(e),
            other => Error::InvalidWidgetJson {
                message: other.to_string(),
            },
        }
    }
}
