//! TOML-based configuration for svn-revert.
//!
//! Sensitive values are stored as `_env` fields that name environment
//! variables. The actual secrets are resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Revert policy.
    #[serde(default)]
    pub revert: RevertConfig,

    /// Subversion credentials and client settings.
    #[serde(default)]
    pub svn: SvnConfig,

    /// Claim records for reverted builds.
    #[serde(default)]
    pub claim: ClaimConfig,

    /// Revert notification email.
    #[serde(default)]
    pub mail: MailConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Revert policy
// ---------------------------------------------------------------------------

/// When to revert and how to word the revert commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertConfig {
    /// Fail the build step when a revert attempt fails outright.
    #[serde(default = "default_true")]
    pub fail_build_on_revert_failure: bool,

    /// Prefix the revert commit message with the reverted commit's message
    /// (only when a single commit is reverted).
    #[serde(default)]
    pub include_previous_message: bool,

    /// Allow reverting builds that contain more than one commit.
    #[serde(default = "default_true")]
    pub revert_multiple_commits: bool,

    /// Never revert a change set whose commit messages contain this text.
    #[serde(default)]
    pub skip_marker: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for RevertConfig {
    fn default() -> Self {
        Self {
            fail_build_on_revert_failure: true,
            include_previous_message: false,
            revert_multiple_commits: true,
            skip_marker: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SVN
// ---------------------------------------------------------------------------

/// Subversion client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvnConfig {
    /// Username used for reverse merges and commits.
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding the SVN password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// `svn` executable.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_password_env() -> String {
    "SVN_PASSWORD".into()
}
fn default_binary() -> String {
    "svn".into()
}

impl Default for SvnConfig {
    fn default() -> Self {
        Self {
            username: None,
            password_env: default_password_env(),
            binary: default_binary(),
            password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// Claim-record settings. Claiming is an optional capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Directory receiving claim records.
    #[serde(default = "default_claim_dir")]
    pub directory: PathBuf,

    /// Name recorded as the claimant.
    #[serde(default = "default_claimed_by")]
    pub claimed_by: String,

    /// Whether the claim should stick to subsequent failing builds.
    #[serde(default = "default_true")]
    pub sticky: bool,
}

fn default_claim_dir() -> PathBuf {
    PathBuf::from("claims")
}
fn default_claimed_by() -> String {
    "svn-revert".into()
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_claim_dir(),
            claimed_by: default_claimed_by(),
            sticky: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Mail
// ---------------------------------------------------------------------------

/// Revert-mail settings. Mail is sent when `smtp` and `from` are both set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP server address (e.g. `smtp.example.com:587`).
    #[serde(default)]
    pub smtp: Option<String>,

    /// Sender email address.
    #[serde(default)]
    pub from: Option<String>,

    /// Recipients that always receive revert mail.
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Domain appended to committer user names to mail them directly
    /// (e.g. `example.com` turns `jdoe` into `jdoe@example.com`).
    #[serde(default)]
    pub email_domain: Option<String>,
}

impl MailConfig {
    pub fn is_enabled(&self) -> bool {
        self.smtp.is_some() && self.from.is_some()
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from the environment.
    ///
    /// A missing variable only logs a warning: a revert without credentials
    /// is reported by the orchestrator, not by configuration loading.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        self.svn.password = resolve_optional_env(&self.svn.password_env, "svn.password_env");
        Ok(())
    }

    /// Validate that the configured values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.svn.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "svn.binary".into(),
                detail: "svn binary must not be empty".into(),
            });
        }
        if let Some(ref marker) = self.revert.skip_marker {
            if marker.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "revert.skip_marker".into(),
                    detail: "skip marker must not be blank".into(),
                });
            }
        }
        if self.claim.enabled && self.claim.claimed_by.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "claim.claimed_by".into(),
                detail: "claimant must not be empty".into(),
            });
        }
        if let Some(ref smtp) = self.mail.smtp {
            if smtp.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "mail.smtp".into(),
                    detail: "SMTP address must not be empty".into(),
                });
            }
        }
        if let Some(ref from) = self.mail.from {
            if !from.contains('@') {
                return Err(ConfigError::InvalidValue {
                    field: "mail.from".into(),
                    detail: format!("'{}' is not an email address", from),
                });
            }
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration written by `svn-revert init`.
    pub fn default_toml() -> &'static str {
        r#"# svn-revert configuration

[revert]
# Fail the build step when a revert attempt fails outright.
fail_build_on_revert_failure = true
# Prefix the revert commit message with the reverted commit's message.
include_previous_message = false
# Allow reverting builds that contain more than one commit.
revert_multiple_commits = true
# skip_marker = "[no-revert]"

[svn]
username = "builder"
password_env = "SVN_PASSWORD"
binary = "svn"

[claim]
enabled = false
directory = "claims"
claimed_by = "svn-revert"
sticky = true

[mail]
# smtp = "smtp.example.com:587"
# from = "ci@example.com"
recipients = []
# email_domain = "example.com"

[log]
level = "info"
"#
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
