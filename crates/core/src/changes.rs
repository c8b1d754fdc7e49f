//! Reading revisions and commit messages out of a build's change set.

use std::collections::BTreeSet;

use tracing::debug;

use crate::errors::RevisionError;
use crate::models::Build;
use crate::revisions::RevisionSet;

/// Source of the changed revisions and commit messages of a build.
pub trait ChangeSetReader {
    /// The revisions changed in `build`. Fails when an entry's identifier is
    /// not an integer or the change set is empty.
    fn revisions(&self, build: &Build) -> Result<RevisionSet, RevisionError>;

    /// All commit messages, space-joined in change set order.
    fn commit_messages(&self, build: &Build) -> String;

    /// Number of distinct commits in the change set.
    fn commit_count(&self, build: &Build) -> usize {
        build
            .changes
            .iter()
            .map(|entry| entry.revision.trim())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Reads the change set straight from the build report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangedRevisions;

impl ChangeSetReader for ChangedRevisions {
    fn revisions(&self, build: &Build) -> Result<RevisionSet, RevisionError> {
        let mut revisions = Vec::with_capacity(build.changes.len());
        for entry in &build.changes {
            let rev = entry
                .revision
                .trim()
                .parse::<i64>()
                .map_err(|_| RevisionError::NotARevision(entry.revision.clone()))?;
            revisions.push(rev);
        }
        let set = RevisionSet::create(revisions)?;
        debug!(revisions = %set, "read changed revisions");
        Ok(set)
    }

    fn commit_messages(&self, build: &Build) -> String {
        build
            .changes
            .iter()
            .map(|entry| entry.message.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
