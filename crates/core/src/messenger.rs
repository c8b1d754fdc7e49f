//! Build-log notices.
//!
//! Every outcome the gate and the orchestrator report to the user is a
//! [`Notice`]. A [`Messenger`] delivers notices; [`BuildLog`] writes them to
//! the build's console log and mirrors them as tracing events. Delivering a
//! notice never fails.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::errors::SvnError;
use crate::models::BuildResult;
use crate::revisions::RevisionSet;

/// One user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoPreviousBuild,
    BuildStatusNotUnstable,
    PreviousBuildStatusNotSuccess,
    NotSubversionScm,
    NoChanges,
    CommitMessageContains(String),
    ChangesOutsideWorkspace,
    TooManyChanges,
    NoCredentials,
    NothingRevertedBecauseOf {
        error_code: Option<String>,
        detail: String,
    },
    FilesToRevertOutOfDate,
    Reverted {
        range_start: u64,
        last: u64,
        url: String,
        result: BuildResult,
    },
    UnexpectedError(String),
}

impl Notice {
    /// Notices reporting a failed revert attempt rather than a policy decision.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::NoCredentials
                | Self::NothingRevertedBecauseOf { .. }
                | Self::FilesToRevertOutOfDate
                | Self::UnexpectedError(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPreviousBuild => {
                write!(f, "Will not revert since there is no previous build.")
            }
            Self::BuildStatusNotUnstable => {
                write!(f, "Will not revert since build status is not UNSTABLE.")
            }
            Self::PreviousBuildStatusNotSuccess => write!(
                f,
                "Will not revert since previous build status is not SUCCESS."
            ),
            Self::NotSubversionScm => write!(
                f,
                "Automatic revert can only be used with Subversion SCM."
            ),
            Self::NoChanges => write!(
                f,
                "Will not revert since there are no changes in current build."
            ),
            Self::CommitMessageContains(marker) => write!(
                f,
                "Will not revert since commit message contains '{}'.",
                marker
            ),
            Self::ChangesOutsideWorkspace => write!(
                f,
                "Will not revert since some changes in commit(s) outside workspace detected."
            ),
            Self::TooManyChanges => write!(
                f,
                "Will not revert since there are multiple commits in the failing build."
            ),
            Self::NoCredentials => write!(f, "No Subversion credentials available."),
            Self::NothingRevertedBecauseOf { error_code, detail } => {
                writeln!(f, "Revert failed because of a Subversion error:")?;
                writeln!(f, "{}", detail)?;
                write!(
                    f,
                    "Subversion Error Code: {}",
                    error_code.as_deref().unwrap_or("unknown")
                )
            }
            Self::FilesToRevertOutOfDate => write!(
                f,
                "Tried to revert since build status became UNSTABLE, \
                 but failed since files to revert are out of date."
            ),
            Self::Reverted {
                range_start,
                last,
                url,
                result,
            } => write!(
                f,
                "Reverted changes between {}:{} in {} since build became {}.",
                range_start, last, url, result
            ),
            Self::UnexpectedError(detail) => {
                write!(f, "Revert failed because of an unexpected error: {}", detail)
            }
        }
    }
}

/// Receiver of build-log notices, one method per notice kind.
///
/// Implementors only provide [`emit`](Self::emit).
pub trait Messenger {
    fn emit(&self, notice: Notice);

    fn inform_no_previous_build(&self) {
        self.emit(Notice::NoPreviousBuild);
    }

    fn inform_build_status_not_unstable(&self) {
        self.emit(Notice::BuildStatusNotUnstable);
    }

    fn inform_previous_build_status_not_success(&self) {
        self.emit(Notice::PreviousBuildStatusNotSuccess);
    }

    fn inform_not_subversion_scm(&self) {
        self.emit(Notice::NotSubversionScm);
    }

    fn inform_no_changes(&self) {
        self.emit(Notice::NoChanges);
    }

    fn inform_commit_message_contains(&self, marker: &str) {
        self.emit(Notice::CommitMessageContains(marker.to_string()));
    }

    fn inform_changes_outside_workspace(&self) {
        self.emit(Notice::ChangesOutsideWorkspace);
    }

    fn inform_too_many_changes(&self) {
        self.emit(Notice::TooManyChanges);
    }

    fn inform_no_credentials(&self) {
        self.emit(Notice::NoCredentials);
    }

    fn inform_nothing_reverted_because_of(&self, error: &SvnError) {
        self.emit(Notice::NothingRevertedBecauseOf {
            error_code: error.error_code(),
            detail: error.to_string(),
        });
    }

    fn inform_files_to_revert_out_of_date(&self) {
        self.emit(Notice::FilesToRevertOutOfDate);
    }

    fn inform_reverted(&self, revisions: &RevisionSet, url: &str, result: BuildResult) {
        self.emit(Notice::Reverted {
            range_start: revisions.range_start(),
            last: revisions.last(),
            url: url.to_string(),
            result,
        });
    }

    /// Report an unexpected error with its full cause chain.
    fn print_error(&self, error: &(dyn std::error::Error + 'static)) {
        let mut detail = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            detail.push_str("\n  caused by: ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        self.emit(Notice::UnexpectedError(detail));
    }
}

/// Messenger writing to a build console log.
pub struct BuildLog<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> BuildLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> Messenger for BuildLog<W> {
    fn emit(&self, notice: Notice) {
        if notice.is_failure() {
            warn!(%notice, "revert notice");
        } else {
            info!(%notice, "revert notice");
        }
        if let Ok(mut out) = self.out.lock() {
            // The build log is best effort.
            let _ = writeln!(out, "{}", notice);
            let _ = out.flush();
        }
    }
}
