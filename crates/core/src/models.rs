//! Domain model types used throughout svn-revert.
//!
//! A [`Build`] is the build-system's view of one finished build: its result,
//! change set, SCM configuration and a summary of the build before it. It is
//! deserialized from the JSON build report handed to the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Build result
// ---------------------------------------------------------------------------

/// Result of a finished build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
            Self::NotBuilt => write!(f, "NOT_BUILT"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

// ---------------------------------------------------------------------------
// SCM configuration
// ---------------------------------------------------------------------------

/// Version-control system configured for the root project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    Subversion,
    #[serde(other)]
    Other,
}

/// One configured module location: where it lives in the repository and
/// where it is checked out, relative to the build workspace unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleLocation {
    pub url: String,
    #[serde(default)]
    pub local: PathBuf,
}

/// SCM configuration of the root project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmConfig {
    pub kind: ScmKind,

    /// Repository root URL (e.g. `https://svn.example.com/repo`).
    #[serde(default)]
    pub repository_root: String,

    /// Checked-out modules, in configuration order.
    #[serde(default)]
    pub modules: Vec<ModuleLocation>,
}

impl ScmConfig {
    pub fn is_subversion(&self) -> bool {
        self.kind == ScmKind::Subversion
    }
}

// ---------------------------------------------------------------------------
// Change set
// ---------------------------------------------------------------------------

/// One commit in a build's change set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Commit identifier as reported by the build system.
    pub revision: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
    /// Repository-absolute changed paths (e.g. `/trunk/src/main.c`).
    #[serde(default)]
    pub paths: Vec<String>,
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// Summary of the build preceding the current one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviousBuild {
    pub number: u64,
    /// `None` while the build has not finished.
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
}

/// The build being evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Name of the root project.
    pub project: String,
    pub number: u64,
    pub result: BuildResult,
    #[serde(default)]
    pub url: Option<String>,
    pub workspace: PathBuf,
    pub scm: ScmConfig,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    #[serde(default)]
    pub previous: Option<PreviousBuild>,
}

impl Build {
    /// Capture the state the decision gate evaluates.
    pub fn outcome_snapshot(&self) -> BuildOutcomeSnapshot {
        BuildOutcomeSnapshot {
            result: self.result,
            previous: self.previous.clone(),
            scm: self.scm.kind,
        }
    }
}

/// Current and previous build state for one gate evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcomeSnapshot {
    pub result: BuildResult,
    pub previous: Option<PreviousBuild>,
    pub scm: ScmKind,
}

// ---------------------------------------------------------------------------
// Revert status
// ---------------------------------------------------------------------------

/// Outcome of one revert attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevertStatus {
    /// Reversal computed and committed.
    RevertSuccessful,
    /// Stale working copy or a Subversion error; nothing was committed.
    NothingReverted,
    /// The revert could not start (e.g. no credentials).
    RevertFailed,
}

impl std::fmt::Display for RevertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RevertSuccessful => write!(f, "revert_successful"),
            Self::NothingReverted => write!(f, "nothing_reverted"),
            Self::RevertFailed => write!(f, "revert_failed"),
        }
    }
}
