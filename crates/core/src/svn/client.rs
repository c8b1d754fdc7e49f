//! Blocking SVN CLI client.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument, warn};

use super::{is_out_of_date, CommitOutcome, VersionControl, VersionControlFactory};
use crate::config::SvnConfig;
use crate::errors::{RevertError, SvnError};
use crate::models::ScmConfig;
use crate::revisions::RevisionSet;

/// Client for reverse merges and commits in local working copies.
#[derive(Debug, Clone)]
pub struct SvnClient {
    binary: String,
    username: String,
    password: String,
}

impl SvnClient {
    /// Create a client running `binary` with the given credentials.
    pub fn new(
        binary: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let client = Self {
            binary: binary.into(),
            username: username.into(),
            password: password.into(),
        };
        info!(binary = %client.binary, username = %client.username, "created SvnClient");
        client
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn run_svn(&self, args: &[&str]) -> Result<String, SvnError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .arg("--non-interactive")
            .arg("--no-auth-cache")
            .arg("--username")
            .arg(&self.username)
            .arg("--password")
            .arg(&self.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("svn {}", args.join(" ")), "running svn command");
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SvnError::BinaryNotFound(self.binary.clone())
            } else {
                SvnError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "svn command failed");
            return Err(SvnError::CommandFailed { exit_code, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl VersionControl for SvnClient {
    #[instrument(skip(self, revisions, root), fields(revisions = %revisions, root = %root.display()))]
    fn reverse_merge(
        &self,
        revisions: &RevisionSet,
        url: &str,
        root: &Path,
    ) -> Result<(), SvnError> {
        let range = format!("{}:{}", revisions.last(), revisions.range_start());
        let source = format!("{}@{}", url, revisions.last());
        let root_str = root.to_string_lossy().to_string();
        self.run_svn(&["merge", "-r", &range, &source, &root_str])?;
        info!(range = %range, "reverse merge applied");
        Ok(())
    }

    #[instrument(skip(self, message, roots), fields(roots = roots.len()))]
    fn commit(&self, message: &str, roots: &[PathBuf]) -> Result<CommitOutcome, SvnError> {
        if roots.is_empty() {
            return Err(SvnError::CommandFailed {
                exit_code: -1,
                stderr: "no working copies to commit".into(),
            });
        }
        let root_strs: Vec<String> = roots
            .iter()
            .map(|r| r.to_string_lossy().to_string())
            .collect();
        let mut args = vec!["commit", "-m", message];
        args.extend(root_strs.iter().map(String::as_str));

        match self.run_svn(&args) {
            Ok(output) => {
                let revision = parse_committed_revision(&output);
                info!(?revision, "svn commit succeeded");
                Ok(CommitOutcome::Committed { revision })
            }
            Err(SvnError::CommandFailed { stderr, .. }) if is_out_of_date(&stderr) => {
                warn!("svn commit rejected: working copy out of date");
                Ok(CommitOutcome::OutOfDate)
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_committed_revision(output: &str) -> Option<u64> {
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("Committed revision") {
            return line
                .trim_start_matches("Committed revision")
                .trim()
                .trim_end_matches('.')
                .parse::<u64>()
                .ok();
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds [`SvnClient`]s from the configured credentials.
#[derive(Debug, Clone)]
pub struct SvnClientFactory {
    binary: String,
    username: Option<String>,
    password: Option<String>,
}

impl SvnClientFactory {
    pub fn new(config: &SvnConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone(),
        }
    }
}

impl VersionControlFactory for SvnClientFactory {
    fn create(
        &self,
        project: &str,
        scm: &ScmConfig,
    ) -> Result<Box<dyn VersionControl>, RevertError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                debug!(project, root = %scm.repository_root, "creating svn client");
                Ok(Box::new(SvnClient::new(
                    self.binary.clone(),
                    username.clone(),
                    password.clone(),
                )))
            }
            _ => {
                warn!(project, "no svn credentials configured");
                Err(RevertError::NoCredentials)
            }
        }
    }
}
