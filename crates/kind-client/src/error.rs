//! Error types for kind backend operations

use thiserror::Error;

/// Errors that can occur while talking to the kind backend.
#[derive(Debug, Error)]
pub enum KindError {
    /// The kind binary exited unsuccessfully
    #[error("`{command}` failed: {message}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Trimmed stderr of the command
        message: String,
    },

    /// Spawning or talking to the kind process failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cluster configuration could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// Backend rejected the request without a process context
    #[error("{0}")]
    Backend(String),

    /// A configuration enum value is not recognized
    #[error("Unknown {field} value: {value}")]
    UnknownValue {
        /// Field the value was given for
        field: &'static str,
        /// Rejected value
        value: String,
    },
}
