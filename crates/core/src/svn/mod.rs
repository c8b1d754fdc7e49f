//! Subversion client contract and its `svn` CLI implementation.

pub mod client;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::errors::{RevertError, SvnError};
use crate::models::ScmConfig;
use crate::revisions::RevisionSet;

pub use client::{SvnClient, SvnClientFactory};

/// Error codes Subversion uses when a commit is rejected because the working
/// copy is based on an older revision than the repository.
const OUT_OF_DATE_CODES: &[&str] = &["E155011", "E160024", "E160028", "E170004"];

/// Result of a multi-root commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Committed; carries the new revision when the server reported it.
    Committed { revision: Option<u64> },
    /// Rejected because the working copy is stale. Nothing was committed.
    OutOfDate,
}

/// The operations a revert needs from a version-control client.
pub trait VersionControl {
    /// Reverse-apply `(range_start, last]` of `url` onto the working copy at
    /// `root`.
    fn reverse_merge(&self, revisions: &RevisionSet, url: &str, root: &Path)
        -> Result<(), SvnError>;

    /// Commit all `roots` atomically with `message`.
    fn commit(&self, message: &str, roots: &[PathBuf]) -> Result<CommitOutcome, SvnError>;
}

/// Creates a client scoped to one project and SCM configuration.
pub trait VersionControlFactory {
    /// Fails with [`RevertError::NoCredentials`] when the project has no
    /// usable credentials.
    fn create(
        &self,
        project: &str,
        scm: &ScmConfig,
    ) -> Result<Box<dyn VersionControl>, RevertError>;
}

fn error_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bE\d{6}\b").expect("error code pattern is valid"))
}

/// First Subversion error code (`E` followed by six digits) in `output`.
pub fn parse_error_code(output: &str) -> Option<String> {
    error_code_regex()
        .find(output)
        .map(|m| m.as_str().to_string())
}

/// Whether `stderr` of a failed commit reports a stale working copy.
pub fn is_out_of_date(stderr: &str) -> bool {
    let codes_match = error_code_regex()
        .find_iter(stderr)
        .any(|m| OUT_OF_DATE_CODES.contains(&m.as_str()));
    codes_match || stderr.contains("out of date") || stderr.contains("out-of-date")
}
