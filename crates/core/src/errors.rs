//! Error types for the svn-revert core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The
//! orchestrator folds the expected categories into a
//! [`RevertStatus`](crate::models::RevertStatus); only [`RevisionError`]
//! escapes it, since a change set that cannot form a revision set means the
//! caller handed us a build it should never have let through.

use thiserror::Error;

// ---------------------------------------------------------------------------
// SVN errors
// ---------------------------------------------------------------------------

/// Errors from SVN CLI operations.
#[derive(Debug, Error)]
pub enum SvnError {
    /// The `svn` binary was not found on `$PATH`.
    #[error("svn binary not found: {0}")]
    BinaryNotFound(String),

    /// An `svn` command exited with a non-zero status.
    #[error("svn command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// Generic I/O wrapper.
    #[error("svn I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SvnError {
    /// The Subversion error code (e.g. `E155011`) reported by the failing
    /// command, if any.
    pub fn error_code(&self) -> Option<String> {
        match self {
            Self::CommandFailed { stderr, .. } => crate::svn::parse_error_code(stderr),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Revision errors
// ---------------------------------------------------------------------------

/// Errors building a [`RevisionSet`](crate::revisions::RevisionSet) from a
/// change set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevisionError {
    /// Empty input, or a revision number that is not positive.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A change set entry whose identifier is not a base-10 integer.
    #[error("change set entry '{0}' is not a revision number")]
    NotARevision(String),
}

// ---------------------------------------------------------------------------
// Revert errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong inside one revert attempt.
///
/// The orchestrator maps these onto a revert status; see
/// [`SvnReverter::revert`](crate::reverter::SvnReverter::revert).
#[derive(Debug, Error)]
pub enum RevertError {
    /// No usable Subversion credentials for the project.
    #[error("no Subversion credentials available")]
    NoCredentials,

    /// A Subversion command ran and reported a failure.
    #[error(transparent)]
    Svn(SvnError),

    /// The `svn` client could not be run at all.
    #[error("svn client could not be run")]
    Environment(#[source] SvnError),

    /// The change set could not be turned into a revision set.
    #[error(transparent)]
    Revision(#[from] RevisionError),

    /// A module's working copy could not be resolved.
    #[error("module '{url}' could not be resolved: {detail}")]
    Module { url: String, detail: String },

}

/// Only failures reported by Subversion itself are version-control errors;
/// a missing or unrunnable client is an environment fault.
impl From<SvnError> for RevertError {
    fn from(err: SvnError) -> Self {
        match err {
            SvnError::CommandFailed { .. } => Self::Svn(err),
            SvnError::BinaryNotFound(_) | SvnError::IoError(_) => Self::Environment(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// Errors from the notification sinks (claim records, email).
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Email delivery failed.
    #[error("email notification failed: {0}")]
    EmailError(String),

    /// Writing the claim record failed.
    #[error("claim failed: {0}")]
    ClaimError(String),

    /// Claim record serialization failed.
    #[error("claim serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Generic I/O wrapper.
    #[error("notification I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
