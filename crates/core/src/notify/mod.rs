//! Notification sinks invoked after a successful revert.
//!
//! Both sinks are fire-and-forget: they log their own failures and never
//! report them back to the decision gate. A sink that is not configured is
//! simply absent.

pub mod claim;
pub mod email;

use crate::models::Build;

pub use claim::{ClaimRecord, Claimer};
pub use email::{RevertMail, RevertMailFormatter, RevertMailSender};

/// Marks a reverted build as claimed so that it is not investigated twice.
pub trait ClaimSink {
    fn claim(&self, build: &Build);
}

/// Tells the committers and the team that their change was reverted.
pub trait MailSink {
    fn send_revert_mail(&self, build: &Build);
}
