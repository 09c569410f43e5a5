use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Email, Mailer, SendError, Sent};
use crate::config::{SmtpConfig, SmtpSecurity};

/// Sends through an SMTP relay, one connection per email.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    cfg: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(cfg: SmtpConfig) -> Self {
        Self { cfg }
    }

    fn transport(&self, host: &str) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let builder = match self.cfg.security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| SendError::Transport(e.to_string()))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| SendError::Transport(e.to_string()))?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        let mut builder = builder.port(self.cfg.port).timeout(Some(self.cfg.timeout));
        if let (Some(user), Some(pass)) = (&self.cfg.username, &self.cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }

    fn message(&self, email: Email) -> Result<Message, SendError> {
        let from: Mailbox = self
            .cfg
            .from_address
            .parse()
            .map_err(|_| SendError::Address(self.cfg.from_address.clone()))?;
        let mut builder = Message::builder().from(from).subject(email.subject);
        for to in &email.to {
            let mailbox: Mailbox = to.parse().map_err(|_| SendError::Address(to.clone()))?;
            builder = builder.to(mailbox);
        }
        let built = match email.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(email.text, html)),
            None => builder.header(ContentType::TEXT_PLAIN).body(email.text),
        };
        built.map_err(|e| SendError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<Sent, SendError> {
        if email.to.is_empty() {
            return Err(SendError::NoRecipients);
        }
        let host = self
            .cfg
            .host
            .as_deref()
            .ok_or_else(|| SendError::Transport("smtp host not configured".into()))?;
        let recipients = email.to.len();
        let message = self.message(email)?;

        tracing::debug!(host, port = self.cfg.port, recipients, "connecting to smtp relay");
        self.transport(host)?
            .send(message)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        Ok(Sent { recipients })
    }
}
