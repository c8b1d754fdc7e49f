//! The set of revisions changed in one build, and the revert range derived
//! from it.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::RevisionError;

/// Non-empty, immutable set of positive revision numbers.
///
/// The revert range is `(range_start, last]`: everything after the last
/// known-good revision up to and including the newest change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionSet {
    revisions: BTreeSet<u64>,
}

impl RevisionSet {
    /// Build a revision set. Fails with [`RevisionError::InvalidArgument`]
    /// when `revisions` is empty or holds a number below 1.
    pub fn create<I>(revisions: I) -> Result<Self, RevisionError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut set = BTreeSet::new();
        for rev in revisions {
            if rev < 1 {
                return Err(RevisionError::InvalidArgument(format!(
                    "revision {} is not positive",
                    rev
                )));
            }
            set.insert(rev as u64);
        }
        if set.is_empty() {
            return Err(RevisionError::InvalidArgument(
                "revision set must not be empty".into(),
            ));
        }
        Ok(Self { revisions: set })
    }

    /// The newest changed revision.
    pub fn last(&self) -> u64 {
        // Non-empty by construction.
        self.revisions.iter().next_back().copied().unwrap_or_default()
    }

    /// The revision just before the oldest change.
    pub fn range_start(&self) -> u64 {
        self.revisions.iter().next().map_or(0, |first| first - 1)
    }

    pub fn count(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_single(&self) -> bool {
        self.count() == 1
    }

    /// Revisions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.revisions.iter().copied()
    }

    /// Resolve a `(s)` plural marker in `template` against the revision count:
    /// `"revision(s)"` becomes `"revision"` for one revision, `"revisions"`
    /// otherwise.
    pub fn pluralize(&self, template: &str) -> String {
        if self.is_single() {
            template.replace("(s)", "")
        } else {
            template.replace("(s)", "s")
        }
    }
}

/// Ascending, comma separated, with consecutive runs compressed:
/// `{5, 7, 8, 9}` renders as `5,7-9`.
impl fmt::Display for RevisionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(u64, u64)> = Vec::new();
        for rev in self.iter() {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == rev => *end = rev,
                _ => runs.push((rev, rev)),
            }
        }
        for (i, (start, end)) in runs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}
