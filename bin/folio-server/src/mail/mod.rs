//! Outbound email.
//!
//! [`Mailer`] is the only seam the rest of the server sees. Sending is
//! best-effort: callers get a `Result<Sent, SendError>`, log it and carry on.
//! No retries, no queue.

mod smtp;
pub mod templates;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SmtpConfig;

pub use smtp::SmtpMailer;
pub use templates::Templates;

/// One rendered email.
#[derive(Debug, Clone)]
pub struct Email {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub to: Vec<String>,
}

/// Delivery receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub recipients: usize,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no recipients")]
    NoRecipients,

    #[error("invalid address {0:?}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp transport error: {0}")]
    Transport(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: Email) -> Result<Sent, SendError>;
}

/// Used when no SMTP host is configured: the email is logged, not sent.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<Sent, SendError> {
        if email.to.is_empty() {
            return Err(SendError::NoRecipients);
        }
        tracing::info!(
            to = ?email.to,
            subject = %email.subject,
            body_len = email.text.len(),
            "smtp not configured; email logged instead of sent"
        );
        Ok(Sent { recipients: email.to.len() })
    }
}

/// Pick the mailer implied by the SMTP section of the configuration.
pub fn build_mailer(cfg: &SmtpConfig) -> Box<dyn Mailer> {
    match cfg.host.as_deref() {
        Some(host) => {
            tracing::info!(host, port = cfg.port, security = %cfg.security, "smtp mailer configured");
            Box::new(SmtpMailer::new(cfg.clone()))
        }
        None => {
            tracing::warn!("FOLIO_SMTP_HOST not set; outgoing email will only be logged");
            Box::new(LogMailer)
        }
    }
}

/// Log the outcome of a best-effort send. Returns whether it went out.
pub fn log_outcome(kind: &str, outcome: &Result<Sent, SendError>) -> bool {
    match outcome {
        Ok(sent) => {
            tracing::info!(kind, recipients = sent.recipients, "email sent");
            true
        }
        Err(e) => {
            tracing::warn!(kind, error = %e, "email not sent");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every email; fails every send when `failing` is set.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub failing: bool,
        pub sent: Mutex<Vec<Email>>,
    }

    impl RecordingMailer {
        pub(crate) fn failing() -> Self {
            Self { failing: true, ..Default::default() }
        }

        pub(crate) fn emails(&self) -> Vec<Email> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: Email) -> Result<Sent, SendError> {
            if self.failing {
                return Err(SendError::Transport("connection refused".into()));
            }
            let recipients = email.to.len();
            self.sent.lock().unwrap().push(email);
            Ok(Sent { recipients })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn email(to: &[&str]) -> Email {
        Email {
            subject: "s".into(),
            text: "t".into(),
            html: None,
            to: to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn log_mailer_reports_recipients() {
        let sent = LogMailer.send(email(&["a@x.test", "b@x.test"])).await.unwrap();
        assert_eq!(sent.recipients, 2);
    }

    #[tokio::test]
    async fn log_mailer_rejects_empty_recipient_list() {
        assert!(matches!(LogMailer.send(email(&[])).await, Err(SendError::NoRecipients)));
    }

    #[test]
    fn log_outcome_reports_failure() {
        assert!(!log_outcome("test", &Err(SendError::Transport("down".into()))));
        assert!(log_outcome("test", &Ok(Sent { recipients: 1 })));
    }
}
