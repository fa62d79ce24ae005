//! Error taxonomy for collection, comparison, and escalation.
//!
//! Only malformed input or unreadable files are errors. Breaking drift is a
//! normal result and is reported through [`crate::Outcome`] instead.

use std::path::PathBuf;

/// Errors surfaced by the lineage components and commands.
#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    /// A path could not be read, listed, or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying port error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The process-wide cancellation flag was raised mid-run.
    #[error("operation cancelled")]
    Cancelled,

    /// An artifact file could not be decoded or encoded.
    #[error("invalid lineage artifact {}: {message}", path.display())]
    Artifact {
        /// Artifact path.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// A loaded artifact reuses a field id.
    #[error("lineage artifact {} contains duplicate field_id {field_id:?}", path.display())]
    DuplicateField {
        /// Artifact path.
        path: PathBuf,
        /// The repeated field id.
        field_id: String,
    },

    /// The system registry violates a load-time invariant.
    #[error("invalid system registry: {0}")]
    Registry(String),

    /// The overrides file could not be used.
    #[error("invalid overrides file {}: {message}", path.display())]
    Overrides {
        /// Overrides file path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// Escalation was requested without a service id.
    #[error("service_id cannot be empty")]
    EmptyServiceId,

    /// Escalation produced no steps.
    #[error("no systems resolved for service {0:?}")]
    NoSystemsResolved(String),

    /// Command-line usage problem.
    #[error("{0}")]
    Usage(String),
}

impl LineageError {
    /// Wraps a port error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Io { path: path.into(), source }
    }
}
