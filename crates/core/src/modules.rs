//! Modules participating in a build: remote location plus local working copy.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::RevertError;
use crate::models::ScmConfig;

/// One independently revertible (remote URL, local root) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub url: String,
    pub root: PathBuf,
}

/// Resolves the modules of an SCM configuration, in configuration order.
pub trait ModuleResolver {
    fn modules(&self, scm: &ScmConfig) -> Result<Vec<Module>, RevertError>;
}

/// Resolves module working copies against a build workspace.
#[derive(Debug, Clone)]
pub struct ModuleFinder {
    workspace: PathBuf,
}

impl ModuleFinder {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    fn module_root(&self, local: &Path) -> PathBuf {
        if local.is_absolute() {
            local.to_path_buf()
        } else {
            self.workspace.join(local)
        }
    }
}

impl ModuleResolver for ModuleFinder {
    fn modules(&self, scm: &ScmConfig) -> Result<Vec<Module>, RevertError> {
        let mut modules = Vec::with_capacity(scm.modules.len());
        for location in &scm.modules {
            if location.url.trim().is_empty() {
                return Err(RevertError::Module {
                    url: location.url.clone(),
                    detail: "module URL is empty".into(),
                });
            }
            let root = self.module_root(&location.local);
            if !root.is_dir() {
                return Err(RevertError::Module {
                    url: location.url.clone(),
                    detail: format!("working copy '{}' does not exist", root.display()),
                });
            }
            debug!(url = %location.url, root = %root.display(), "resolved module");
            modules.push(Module {
                url: location.url.clone(),
                root,
            });
        }
        Ok(modules)
    }
}
