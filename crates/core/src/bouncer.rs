//! The decision gate in front of the reverter.
//!
//! [`Bouncer::evaluate`] runs an ordered list of guards. The first guard that
//! fails reports one notice and ends the evaluation with success; only a
//! revert that fails outright can fail the build step.

use tracing::{debug, info, instrument};

use crate::changes::ChangeSetReader;
use crate::config::RevertConfig;
use crate::errors::RevisionError;
use crate::messenger::Messenger;
use crate::models::{Build, BuildResult, RevertStatus};
use crate::notify::{ClaimSink, MailSink};
use crate::reverter::Reverter;
use crate::safety::{ChangeLocator, CommitCountRule};

/// Policy flags supplied by the build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertPolicy {
    pub fail_build_on_revert_failure: bool,
    pub include_previous_message: bool,
    pub revert_multiple_commits: bool,
    pub skip_marker: Option<String>,
}

impl Default for RevertPolicy {
    fn default() -> Self {
        Self::from(&RevertConfig::default())
    }
}

impl From<&RevertConfig> for RevertPolicy {
    fn from(config: &RevertConfig) -> Self {
        Self {
            fail_build_on_revert_failure: config.fail_build_on_revert_failure,
            include_previous_message: config.include_previous_message,
            revert_multiple_commits: config.revert_multiple_commits,
            skip_marker: config.skip_marker.clone(),
        }
    }
}

/// Decides whether an unstable build gets its changes reverted.
pub struct Bouncer<'a> {
    messenger: &'a dyn Messenger,
    reverter: &'a dyn Reverter,
    changes: &'a dyn ChangeSetReader,
    locator: ChangeLocator,
    claimer: Option<&'a dyn ClaimSink>,
    mailer: Option<&'a dyn MailSink>,
    policy: RevertPolicy,
}

impl<'a> Bouncer<'a> {
    pub fn new(
        messenger: &'a dyn Messenger,
        reverter: &'a dyn Reverter,
        changes: &'a dyn ChangeSetReader,
        policy: RevertPolicy,
    ) -> Self {
        Self {
            messenger,
            reverter,
            changes,
            locator: ChangeLocator,
            claimer: None,
            mailer: None,
            policy,
        }
    }

    /// Claim reverted builds. Without a claimer, claiming is skipped.
    pub fn with_claimer(mut self, claimer: &'a dyn ClaimSink) -> Self {
        self.claimer = Some(claimer);
        self
    }

    /// Mail committers about reverts. Without a mailer, no mail is sent.
    pub fn with_mailer(mut self, mailer: &'a dyn MailSink) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Evaluate the guards for `build` and revert when all of them pass.
    ///
    /// Returns `false` only when the revert failed outright and the policy
    /// says such a failure fails the build.
    #[instrument(skip(self, build), fields(project = %build.project, build = build.number))]
    pub fn evaluate(&self, build: &Build) -> Result<bool, RevisionError> {
        let snapshot = build.outcome_snapshot();

        let previous = match snapshot.previous {
            Some(previous) => previous,
            None => {
                self.messenger.inform_no_previous_build();
                return Ok(true);
            }
        };
        // The snapshot is taken once, so this also covers a previous build
        // that is still running when the result checks pass.
        if previous.building {
            debug!(previous = previous.number, "previous build still running");
            return Ok(true);
        }

        if snapshot.result != BuildResult::Unstable {
            self.messenger.inform_build_status_not_unstable();
            return Ok(true);
        }

        if previous.result != Some(BuildResult::Success) {
            self.messenger.inform_previous_build_status_not_success();
            return Ok(true);
        }

        if !build.scm.is_subversion() {
            self.messenger.inform_not_subversion_scm();
            return Ok(true);
        }

        if build.changes.is_empty() {
            self.messenger.inform_no_changes();
            return Ok(true);
        }

        if let Some(ref marker) = self.policy.skip_marker {
            if self.changes.commit_messages(build).contains(marker.as_str()) {
                self.messenger.inform_commit_message_contains(marker);
                return Ok(true);
            }
        }

        if self.locator.changes_outside_workspace(build) {
            self.messenger.inform_changes_outside_workspace();
            return Ok(true);
        }

        let verdict = CommitCountRule::new(self.policy.revert_multiple_commits)
            .check(self.changes.commit_count(build));
        if !verdict.may_revert {
            self.messenger.inform_too_many_changes();
            return Ok(true);
        }

        let fold = self.policy.include_previous_message && verdict.single_commit;
        let status = self.reverter.revert(build, self.messenger, fold)?;
        info!(%status, "revert attempt finished");

        match status {
            RevertStatus::RevertSuccessful => {
                if let Some(claimer) = self.claimer {
                    claimer.claim(build);
                }
                if let Some(mailer) = self.mailer {
                    mailer.send_revert_mail(build);
                }
                Ok(true)
            }
            RevertStatus::NothingReverted => Ok(true),
            RevertStatus::RevertFailed => Ok(!self.policy.fail_build_on_revert_failure),
        }
    }
}
