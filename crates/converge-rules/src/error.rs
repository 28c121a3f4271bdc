//! Error types for converge-rules

use std::path::PathBuf;

/// Result type for converge-rules operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur loading or applying rules
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rule bundle exists but its content is invalid
    #[error("Invalid rule bundle {bundle}: {message}")]
    Bundle { bundle: String, message: String },

    /// A rule bundle could not be read
    #[error("Cannot load rule bundle {bundle} from {path}: {source}")]
    BundleUnreadable {
        bundle: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A script line has a malformed or unknown placeholder
    #[error("Invalid script template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Two rules of one system share a name
    #[error("Duplicate rule '{rule}' in system {system}")]
    DuplicateRule { system: String, rule: String },

    /// A command response reported failure
    #[error("Operation failed: {message}")]
    ResponseFailed { message: String },

    /// Error from converge-model
    #[error(transparent)]
    Model(#[from] converge_model::Error),
}

impl Error {
    pub fn bundle(bundle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bundle {
            bundle: bundle.into(),
            message: message.into(),
        }
    }
}
