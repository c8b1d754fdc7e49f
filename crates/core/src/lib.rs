//! svn-revert core library.
//!
//! This crate decides whether an unstable build should have its changes
//! reverted and performs the revert: the guard sequence ([`Bouncer`]), the
//! safety checks, the revert orchestration ([`SvnReverter`]) over a
//! Subversion client, and the notification sinks that run after a revert.

pub mod bouncer;
pub mod changes;
pub mod config;
pub mod errors;
pub mod messenger;
pub mod models;
pub mod modules;
pub mod notify;
pub mod reverter;
pub mod revisions;
pub mod safety;
pub mod svn;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience.
pub use bouncer::{Bouncer, RevertPolicy};
pub use changes::{ChangeSetReader, ChangedRevisions};
pub use config::AppConfig;
pub use messenger::{BuildLog, Messenger, Notice};
pub use models::{Build, BuildResult, RevertStatus};
pub use modules::{Module, ModuleFinder, ModuleResolver};
pub use reverter::{Reverter, SvnReverter};
pub use revisions::RevisionSet;
pub use svn::{SvnClient, SvnClientFactory};
