//! Guard predicates evaluated before any revert is attempted.
//!
//! Both checks are pure: they read already-resolved build data and never
//! touch the working copy or the repository.

use tracing::debug;

use crate::models::{Build, ModuleLocation, ScmConfig};

// ---------------------------------------------------------------------------
// ChangeLocator
// ---------------------------------------------------------------------------

/// Decides whether a change set touches paths outside the checked-out
/// modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeLocator;

impl ChangeLocator {
    /// `true` when any changed path lies outside every module, or when that
    /// cannot be determined.
    pub fn changes_outside_workspace(&self, build: &Build) -> bool {
        let module_paths = match module_repository_paths(&build.scm) {
            Some(paths) if !paths.is_empty() => paths,
            _ => {
                debug!("could not resolve module repository paths");
                return true;
            }
        };

        for change in &build.changes {
            if change.paths.is_empty() {
                debug!(revision = %change.revision, "change has no recorded paths");
                return true;
            }
            for path in &change.paths {
                if !module_paths.iter().any(|module| is_within(path, module)) {
                    debug!(revision = %change.revision, path = %path, "change outside workspace");
                    return true;
                }
            }
        }
        false
    }
}

/// Repository-absolute path of every module, without trailing slash (the
/// repository root itself is `""`). `None` if any module URL is not under
/// the repository root.
fn module_repository_paths(scm: &ScmConfig) -> Option<Vec<String>> {
    let root = scm.repository_root.trim_end_matches('/');
    if root.is_empty() {
        return None;
    }
    scm.modules
        .iter()
        .map(|ModuleLocation { url, .. }| {
            let rest = url.trim_end_matches('/').strip_prefix(root)?;
            if !rest.is_empty() && !rest.starts_with('/') {
                return None;
            }
            Some(percent_decode(rest))
        })
        .collect()
}

fn is_within(path: &str, module: &str) -> bool {
    let path = path.trim_end_matches('/');
    module.is_empty()
        || path == module
        || path
            .strip_prefix(module)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Decode `%XX` escapes; changed paths are reported unescaped while URLs
/// are not.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// CommitCountRule
// ---------------------------------------------------------------------------

/// Outcome of the commit-count rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitCountVerdict {
    /// Whether the revert may proceed.
    pub may_revert: bool,
    /// Exactly one commit is being reverted; only then can its message be
    /// folded into the revert commit message.
    pub single_commit: bool,
}

/// "Allow reverting multiple simultaneous commits" policy.
#[derive(Debug, Clone, Copy)]
pub struct CommitCountRule {
    revert_multiple_commits: bool,
}

impl CommitCountRule {
    pub fn new(revert_multiple_commits: bool) -> Self {
        Self {
            revert_multiple_commits,
        }
    }

    pub fn check(&self, commit_count: usize) -> CommitCountVerdict {
        let single_commit = commit_count == 1;
        CommitCountVerdict {
            may_revert: self.revert_multiple_commits || commit_count <= 1,
            single_commit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeEntry;
    use crate::testing::build_with_changes;

    fn change(paths: &[&str]) -> ChangeEntry {
        ChangeEntry {
            revision: "911".into(),
            author: "alice".into(),
            message: "msg".into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_changes_inside_module() {
        let build = build_with_changes(vec![change(&["/trunk/src/a.c", "/trunk/README"])]);
        assert!(!ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_change_outside_module() {
        let build = build_with_changes(vec![change(&["/trunk/src/a.c", "/branches/x/b.c"])]);
        assert!(ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_sibling_prefix_is_outside() {
        let build = build_with_changes(vec![change(&["/trunk-old/a.c"])]);
        assert!(ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_module_directory_itself_is_inside() {
        let build = build_with_changes(vec![change(&["/trunk"])]);
        assert!(!ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_module_url_not_under_root_fails_safe() {
        let mut build = build_with_changes(vec![change(&["/trunk/a.c"])]);
        build.scm.modules[0].url = "https://other.example.com/repo/trunk".into();
        assert!(ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_no_modules_fails_safe() {
        let mut build = build_with_changes(vec![change(&["/trunk/a.c"])]);
        build.scm.modules.clear();
        assert!(ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_change_without_paths_fails_safe() {
        let build = build_with_changes(vec![change(&[])]);
        assert!(ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_escaped_module_url() {
        let mut build = build_with_changes(vec![change(&["/trunk/my project/a.c"])]);
        build.scm.modules[0].url = "https://svn.example.com/repo/trunk/my%20project".into();
        assert!(!ChangeLocator.changes_outside_workspace(&build));
    }

    #[test]
    fn test_commit_count_rule() {
        let strict = CommitCountRule::new(false);
        assert!(strict.check(1).may_revert);
        assert!(strict.check(1).single_commit);
        assert!(!strict.check(2).may_revert);

        let lenient = CommitCountRule::new(true);
        let verdict = lenient.check(3);
        assert!(verdict.may_revert);
        assert!(!verdict.single_commit);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b"), "/a b");
        assert_eq!(percent_decode("/100%"), "/100%");
        assert_eq!(percent_decode("/x%zz"), "/x%zz");
    }
}
