//! Error types for run domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing run domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunDomainError {
    /// The backend run identifier is empty after trimming.
    #[error("run identifier must not be empty")]
    EmptyRunId,

    /// The CI check reference is empty after trimming.
    #[error("check reference must not be empty")]
    EmptyCheckRef,

    /// The check suite identifier is zero.
    #[error("invalid check suite identifier {0}, expected a positive integer")]
    InvalidCheckSuiteId(u64),

    /// The backend endpoint is empty after trimming.
    #[error("backend endpoint must not be empty")]
    EmptyEndpoint,

    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// A run specification has no name.
    #[error("run name must not be empty")]
    EmptyRunName,

    /// The head revision is empty after trimming.
    #[error("head revision must not be empty")]
    EmptyRevision,

    /// The check suite action is not one the bridge understands.
    #[error("unsupported check suite action: {0}")]
    UnsupportedAction(String),
}

/// Error returned while parsing a canonical state label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown canonical state: {0}")]
pub struct ParseCanonicalStateError(pub String);
