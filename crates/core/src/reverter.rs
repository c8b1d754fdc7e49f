//! Revert orchestration: reverse-merge every module, then commit once.
//!
//! The commit is the atomic boundary. A failed reverse merge stops the run
//! before anything is committed and leaves already merged working copies as
//! they are; the next checkout cleans them up.

use std::path::PathBuf;

use tracing::{error, info, instrument, warn};

use crate::changes::ChangeSetReader;
use crate::errors::{RevertError, RevisionError};
use crate::messenger::Messenger;
use crate::models::{Build, RevertStatus};
use crate::modules::ModuleResolver;
use crate::revisions::RevisionSet;
use crate::svn::{CommitOutcome, VersionControlFactory};

/// Something that can revert the change set of a build.
pub trait Reverter {
    /// Revert the changes of `build`, reporting progress to `messenger`.
    ///
    /// Expected failures are folded into the returned status. Only a change
    /// set that cannot form a revision set is returned as an error.
    fn revert(
        &self,
        build: &Build,
        messenger: &dyn Messenger,
        fold_previous_message: bool,
    ) -> Result<RevertStatus, RevisionError>;
}

/// Reverts through Subversion reverse merges.
pub struct SvnReverter<'a> {
    factory: &'a dyn VersionControlFactory,
    modules: &'a dyn ModuleResolver,
    changes: &'a dyn ChangeSetReader,
}

impl<'a> SvnReverter<'a> {
    pub fn new(
        factory: &'a dyn VersionControlFactory,
        modules: &'a dyn ModuleResolver,
        changes: &'a dyn ChangeSetReader,
    ) -> Self {
        Self {
            factory,
            modules,
            changes,
        }
    }

    /// Message of the revert commit, optionally prefixed with the messages
    /// of the reverted commits.
    pub fn commit_message(
        &self,
        build: &Build,
        revisions: &RevisionSet,
        fold_previous_message: bool,
    ) -> String {
        let message = format!(
            "Automatically reverted {} {} since build {} became {}.",
            revisions.pluralize("revision(s)"),
            revisions,
            build.project,
            build.result
        );
        if fold_previous_message {
            format!("{} {}", self.changes.commit_messages(build), message)
        } else {
            message
        }
    }

    fn revert_and_commit(
        &self,
        build: &Build,
        messenger: &dyn Messenger,
        fold_previous_message: bool,
    ) -> Result<RevertStatus, RevertError> {
        let client = self.factory.create(&build.project, &build.scm)?;

        let modules = self.modules.modules(&build.scm)?;
        if modules.is_empty() {
            return Err(RevertError::Module {
                url: build.scm.repository_root.clone(),
                detail: "no modules configured".into(),
            });
        }

        let revisions = self.changes.revisions(build)?;

        let mut roots: Vec<PathBuf> = Vec::with_capacity(modules.len());
        for module in &modules {
            client.reverse_merge(&revisions, &module.url, &module.root)?;
            roots.push(module.root.clone());
        }

        let message = self.commit_message(build, &revisions, fold_previous_message);
        match client.commit(&message, &roots)? {
            CommitOutcome::Committed { revision } => {
                info!(revisions = %revisions, ?revision, "revert committed");
                for module in &modules {
                    messenger.inform_reverted(&revisions, &module.url, build.result);
                }
                Ok(RevertStatus::RevertSuccessful)
            }
            CommitOutcome::OutOfDate => {
                messenger.inform_files_to_revert_out_of_date();
                Ok(RevertStatus::NothingReverted)
            }
        }
    }
}

impl Reverter for SvnReverter<'_> {
    #[instrument(skip(self, build, messenger), fields(project = %build.project, build = build.number))]
    fn revert(
        &self,
        build: &Build,
        messenger: &dyn Messenger,
        fold_previous_message: bool,
    ) -> Result<RevertStatus, RevisionError> {
        let status = match self.revert_and_commit(build, messenger, fold_previous_message) {
            Ok(status) => status,
            Err(RevertError::NoCredentials) => {
                messenger.inform_no_credentials();
                RevertStatus::RevertFailed
            }
            // Environment faults fall through to the catch-all below.
            Err(RevertError::Svn(e)) => {
                warn!(error = %e, "subversion error, nothing reverted");
                messenger.inform_nothing_reverted_because_of(&e);
                RevertStatus::NothingReverted
            }
            Err(RevertError::Revision(e)) => return Err(e),
            Err(e) => {
                error!(error = %e, "revert failed");
                messenger.print_error(&e);
                RevertStatus::RevertFailed
            }
        };
        info!(%status, "revert finished");
        Ok(status)
    }
}
