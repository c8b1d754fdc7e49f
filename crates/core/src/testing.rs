//! Recording fakes shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::{RevertError, RevisionError, SvnError};
use crate::messenger::{Messenger, Notice};
use crate::models::{
    Build, BuildResult, ChangeEntry, ModuleLocation, PreviousBuild, RevertStatus, ScmConfig,
    ScmKind,
};
use crate::modules::{Module, ModuleResolver};
use crate::notify::{ClaimSink, MailSink};
use crate::reverter::Reverter;
use crate::revisions::RevisionSet;
use crate::svn::{CommitOutcome, VersionControl, VersionControlFactory};

/// An UNSTABLE build #42 of `job-name` following a successful #41, with one
/// Subversion module checked out at `trunk`.
pub(crate) fn build_with_changes(changes: Vec<ChangeEntry>) -> Build {
    Build {
        project: "job-name".into(),
        number: 42,
        result: BuildResult::Unstable,
        url: None,
        workspace: std::env::temp_dir().join("svn-revert-test-ws"),
        scm: ScmConfig {
            kind: ScmKind::Subversion,
            repository_root: "https://svn.example.com/repo".into(),
            modules: vec![ModuleLocation {
                url: "https://svn.example.com/repo/trunk".into(),
                local: "trunk".into(),
            }],
        },
        changes,
        previous: Some(PreviousBuild {
            number: 41,
            result: Some(BuildResult::Success),
            building: false,
        }),
    }
}

pub(crate) fn change(revision: &str, message: &str) -> ChangeEntry {
    ChangeEntry {
        revision: revision.into(),
        author: "alice".into(),
        message: message.into(),
        paths: vec!["/trunk/src/a.c".into()],
    }
}

// ---------------------------------------------------------------------------
// Messenger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct RecordingMessenger {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingMessenger {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Messenger for RecordingMessenger {
    fn emit(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// ---------------------------------------------------------------------------
// Version control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VcsCall {
    ReverseMerge {
        revisions: RevisionSet,
        url: String,
        root: PathBuf,
    },
    Commit {
        message: String,
        roots: Vec<PathBuf>,
    },
}

/// How the fake client answers.
#[derive(Debug, Clone, Default)]
pub(crate) struct VcsScript {
    /// Fail the reverse merge of this URL with the given stderr.
    pub merge_failure: Option<(String, String)>,
    /// Fail the commit with the given stderr.
    pub commit_failure: Option<String>,
    pub commit_out_of_date: bool,
    /// Every call fails as if the `svn` binary were missing.
    pub client_missing: bool,
}

struct FakeVcs {
    calls: Arc<Mutex<Vec<VcsCall>>>,
    script: VcsScript,
}

impl VersionControl for FakeVcs {
    fn reverse_merge(
        &self,
        revisions: &RevisionSet,
        url: &str,
        root: &Path,
    ) -> Result<(), SvnError> {
        self.calls.lock().unwrap().push(VcsCall::ReverseMerge {
            revisions: revisions.clone(),
            url: url.to_string(),
            root: root.to_path_buf(),
        });
        if self.script.client_missing {
            return Err(SvnError::BinaryNotFound("svn".into()));
        }
        match self.script.merge_failure {
            Some((ref failing_url, ref stderr)) if failing_url == url => {
                Err(SvnError::CommandFailed {
                    exit_code: 1,
                    stderr: stderr.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn commit(&self, message: &str, roots: &[PathBuf]) -> Result<CommitOutcome, SvnError> {
        self.calls.lock().unwrap().push(VcsCall::Commit {
            message: message.to_string(),
            roots: roots.to_vec(),
        });
        if self.script.client_missing {
            return Err(SvnError::BinaryNotFound("svn".into()));
        }
        if let Some(ref stderr) = self.script.commit_failure {
            return Err(SvnError::CommandFailed {
                exit_code: 1,
                stderr: stderr.clone(),
            });
        }
        if self.script.commit_out_of_date {
            return Ok(CommitOutcome::OutOfDate);
        }
        Ok(CommitOutcome::Committed {
            revision: Some(1000),
        })
    }
}

/// Hands out fake clients that all record into one call log.
#[derive(Default)]
pub(crate) struct FakeFactory {
    pub calls: Arc<Mutex<Vec<VcsCall>>>,
    pub script: VcsScript,
    pub no_credentials: bool,
}

impl FakeFactory {
    pub(crate) fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl VersionControlFactory for FakeFactory {
    fn create(
        &self,
        _project: &str,
        _scm: &ScmConfig,
    ) -> Result<Box<dyn VersionControl>, RevertError> {
        if self.no_credentials {
            return Err(RevertError::NoCredentials);
        }
        Ok(Box::new(FakeVcs {
            calls: Arc::clone(&self.calls),
            script: self.script.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

pub(crate) struct FakeModules {
    pub modules: Vec<Module>,
    pub unresolvable: bool,
}

impl FakeModules {
    pub(crate) fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            modules: pairs
                .iter()
                .map(|(url, root)| Module {
                    url: url.to_string(),
                    root: PathBuf::from(root),
                })
                .collect(),
            unresolvable: false,
        }
    }
}

impl ModuleResolver for FakeModules {
    fn modules(&self, _scm: &ScmConfig) -> Result<Vec<Module>, RevertError> {
        if self.unresolvable {
            return Err(RevertError::Module {
                url: "https://svn.example.com/repo/trunk".into(),
                detail: "working copy missing".into(),
            });
        }
        Ok(self.modules.clone())
    }
}

// ---------------------------------------------------------------------------
// Reverter
// ---------------------------------------------------------------------------

/// Returns a fixed outcome and records the fold flag of every call.
pub(crate) struct FakeReverter {
    outcome: Result<RevertStatus, RevisionError>,
    calls: Mutex<Vec<bool>>,
}

impl FakeReverter {
    pub(crate) fn returning(status: RevertStatus) -> Self {
        Self {
            outcome: Ok(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: RevisionError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fold flags passed to each `revert` call.
    pub(crate) fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

impl Reverter for FakeReverter {
    fn revert(
        &self,
        _build: &Build,
        _messenger: &dyn Messenger,
        fold_previous_message: bool,
    ) -> Result<RevertStatus, RevisionError> {
        self.calls.lock().unwrap().push(fold_previous_message);
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// Claim and mail sinks
// ---------------------------------------------------------------------------

/// Shared log of sink invocations, in call order.
pub(crate) type SinkLog = Arc<Mutex<Vec<String>>>;

pub(crate) struct RecordingClaimer(pub SinkLog);

impl ClaimSink for RecordingClaimer {
    fn claim(&self, build: &Build) {
        self.0.lock().unwrap().push(format!("claim #{}", build.number));
    }
}

pub(crate) struct RecordingMailer(pub SinkLog);

impl MailSink for RecordingMailer {
    fn send_revert_mail(&self, build: &Build) {
        self.0.lock().unwrap().push(format!("mail #{}", build.number));
    }
}
