//! Revert mail via SMTP.
//!
//! [`RevertMailFormatter`] renders the plain-text mail; [`RevertMailSender`]
//! delivers it with the `lettre` SMTP transport.

use std::collections::BTreeSet;

use lettre::message::{header::ContentType, Mailbox};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info, warn};

use super::MailSink;
use crate::changes::{ChangeSetReader, ChangedRevisions};
use crate::config::MailConfig;
use crate::errors::NotificationError;
use crate::models::Build;

/// A rendered revert mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertMail {
    pub subject: String,
    pub body: String,
}

/// Renders the mail announcing a revert.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevertMailFormatter;

impl RevertMailFormatter {
    pub fn format(&self, build: &Build) -> RevertMail {
        let revisions = ChangedRevisions.revisions(build).ok();
        let reverted = match revisions {
            Some(ref revs) => format!("{} {}", revs.pluralize("revision(s)"), revs),
            None => "changes".to_string(),
        };

        let subject = format!(
            "[svn-revert] {} #{}: reverted {}",
            build.project, build.number, reverted
        );

        let mut body = format!(
            "Build #{} of {} became {}.\n\
             The following {} reverted automatically:\n\n",
            build.number,
            build.project,
            build.result,
            match revisions {
                Some(ref revs) if revs.is_single() => "change was",
                _ => "changes were",
            },
        );
        for change in &build.changes {
            body.push_str(&format!(
                "  r{} by {}: {}\n",
                change.revision.trim(),
                display_author(&change.author),
                change.message.trim()
            ));
        }
        if let Some(ref url) = build.url {
            body.push_str(&format!("\nBuild: {}\n", url));
        }
        body.push_str("\nPlease fix the problem and commit again.\n");

        RevertMail { subject, body }
    }
}

fn display_author(author: &str) -> &str {
    if author.trim().is_empty() {
        "unknown"
    } else {
        author.trim()
    }
}

/// SMTP delivery of revert mails.
pub struct RevertMailSender {
    smtp_addr: String,
    from: String,
    recipients: Vec<String>,
    email_domain: Option<String>,
    formatter: RevertMailFormatter,
}

impl RevertMailSender {
    /// `None` when the mail section has no SMTP server or sender.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        match (&config.smtp, &config.from) {
            (Some(smtp), Some(from)) => {
                info!(smtp = %smtp, from = %from, "revert mail enabled");
                Some(Self {
                    smtp_addr: smtp.clone(),
                    from: from.clone(),
                    recipients: config.recipients.clone(),
                    email_domain: config.email_domain.clone().filter(|d| !d.is_empty()),
                    formatter: RevertMailFormatter,
                })
            }
            _ => None,
        }
    }

    /// Configured recipients followed by every distinct committer, when a
    /// committer domain is configured.
    pub fn recipients(&self, build: &Build) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for r in &self.recipients {
            if seen.insert(r.clone()) {
                out.push(r.clone());
            }
        }
        if let Some(ref domain) = self.email_domain {
            for change in &build.changes {
                let author = change.author.trim();
                if author.is_empty() {
                    continue;
                }
                let address = format!("{}@{}", author, domain);
                if seen.insert(address.clone()) {
                    out.push(address);
                }
            }
        }
        out
    }

    /// Render and send the revert mail for `build`.
    pub fn send(&self, build: &Build) -> Result<(), NotificationError> {
        let recipients = self.recipients(build);
        if recipients.is_empty() {
            debug!(project = %build.project, "no revert mail recipients");
            return Ok(());
        }
        let mail = self.formatter.format(build);
        let message = self.build_message(&mail, &recipients)?;

        let transport = self.build_transport()?;
        transport.send(&message).map_err(|e| {
            NotificationError::EmailError(format!("SMTP send failed: {}", e))
        })?;
        info!(to = ?recipients, subject = %mail.subject, "revert mail sent");
        Ok(())
    }

    fn build_message(
        &self,
        mail: &RevertMail,
        recipients: &[String],
    ) -> Result<Message, NotificationError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| NotificationError::EmailError(format!("invalid from address: {}", e)))?;

        let mut builder = Message::builder().from(from).subject(mail.subject.clone());
        let mut accepted = 0;
        for recipient in recipients {
            match recipient.parse::<Mailbox>() {
                Ok(to) => {
                    builder = builder.to(to);
                    accepted += 1;
                }
                Err(e) => warn!(recipient = %recipient, error = %e, "skipping invalid recipient"),
            }
        }
        if accepted == 0 {
            return Err(NotificationError::EmailError(
                "no valid recipient address".into(),
            ));
        }
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| NotificationError::EmailError(format!("failed to build email: {}", e)))
    }

    /// STARTTLS transport for the configured `host[:port]`.
    fn build_transport(&self) -> Result<SmtpTransport, NotificationError> {
        let (host, port) = split_host_port(&self.smtp_addr);
        let transport = SmtpTransport::starttls_relay(host)
            .map_err(|e| NotificationError::EmailError(format!("SMTP connection error: {}", e)))?
            .port(port)
            .build();
        Ok(transport)
    }
}

fn split_host_port(addr: &str) -> (&str, u16) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().unwrap_or(587)),
        None => (addr, 587),
    }
}

impl MailSink for RevertMailSender {
    fn send_revert_mail(&self, build: &Build) {
        if let Err(e) = self.send(build) {
            warn!(project = %build.project, build = build.number, error = %e, "revert mail failed");
        }
    }
}
