//! Claim records for reverted builds.
//!
//! A claim is a small JSON document written next to the other build
//! artifacts. The build system (or a human) reads it to see that the
//! failure has already been dealt with.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ClaimSink;
use crate::changes::{ChangeSetReader, ChangedRevisions};
use crate::config::ClaimConfig;
use crate::errors::NotificationError;
use crate::models::Build;

/// Persisted claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRecord {
    pub project: String,
    pub build: u64,
    pub claimed_by: String,
    pub reason: String,
    pub sticky: bool,
    pub claimed_at: DateTime<Utc>,
}

/// Writes claim records into a directory.
#[derive(Debug, Clone)]
pub struct Claimer {
    directory: PathBuf,
    claimed_by: String,
    sticky: bool,
}

impl Claimer {
    pub fn new(config: &ClaimConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            claimed_by: config.claimed_by.clone(),
            sticky: config.sticky,
        }
    }

    /// Location of the claim record for `build`.
    pub fn record_path(&self, build: &Build) -> PathBuf {
        self.directory.join(format!(
            "{}-{}.claim.json",
            file_name_safe(&build.project),
            build.number
        ))
    }

    /// Build the record for `build` without writing it.
    pub fn record(&self, build: &Build) -> ClaimRecord {
        let reason = match ChangedRevisions.revisions(build) {
            Ok(revisions) => {
                format!("{} {}.", revisions.pluralize("Reverted revision(s)"), revisions)
            }
            Err(_) => format!("Reverted the changes of build #{}.", build.number),
        };
        ClaimRecord {
            project: build.project.clone(),
            build: build.number,
            claimed_by: self.claimed_by.clone(),
            reason,
            sticky: self.sticky,
            claimed_at: Utc::now(),
        }
    }

    /// Write the claim record for `build`, replacing any earlier one.
    pub fn write_claim(&self, build: &Build) -> Result<PathBuf, NotificationError> {
        let record = self.record(build);
        std::fs::create_dir_all(&self.directory)?;
        let path = self.record_path(build);
        write_record(&path, &record)?;
        info!(
            project = %record.project,
            build = record.build,
            path = %path.display(),
            "build claimed"
        );
        Ok(path)
    }
}

fn write_record(path: &Path, record: &ClaimRecord) -> Result<(), NotificationError> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json).map_err(|e| {
        NotificationError::ClaimError(format!("cannot write '{}': {}", path.display(), e))
    })
}

impl ClaimSink for Claimer {
    fn claim(&self, build: &Build) {
        if let Err(e) = self.write_claim(build) {
            warn!(project = %build.project, build = build.number, error = %e, "claim failed");
        }
    }
}

/// `name` with every character outside `[A-Za-z0-9._-]` replaced by `_`, so
/// it stays a single path component.
fn file_name_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
