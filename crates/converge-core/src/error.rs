//! Error types for converge-core

use std::path::PathBuf;

/// Result type for converge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a reconciliation run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input document names a system the rule bundle does not know
    #[error("Unknown system '{system}' in {source_name}")]
    UnknownSystem { system: String, source_name: String },

    /// The command executor failed
    #[error("Command failed: {command}: {message}")]
    CommandExecution { command: String, message: String },

    /// A system did not settle within the configured number of passes
    #[error("System {system} from {source_name} did not converge within {passes} passes")]
    PassLimitExceeded {
        system: String,
        source_name: String,
        passes: usize,
    },

    /// A failure while reconciling one system from one document
    #[error("Failed to reconcile {system} from {source_name}: {source}")]
    Reconcile {
        system: String,
        source_name: String,
        #[source]
        source: Box<Error>,
    },

    /// Settings file could not be read
    #[error("Cannot read settings from {path}: {source}")]
    SettingsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML
    #[error("Invalid settings in {path}: {source}")]
    SettingsInvalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Transparent wrappers for underlying crate errors
    /// Rule error from converge-rules
    #[error(transparent)]
    Rules(#[from] converge_rules::Error),

    /// Model error from converge-model
    #[error(transparent)]
    Model(#[from] converge_model::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the system and document being reconciled, unless the error
    /// already names them
    pub fn in_context(self, system: &str, source_name: &str) -> Self {
        match self {
            Self::UnknownSystem { .. } | Self::PassLimitExceeded { .. } | Self::Reconcile { .. } => {
                self
            }
            other => Self::Reconcile {
                system: system.to_string(),
                source_name: source_name.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            message: message.into(),
        }
    }
}
