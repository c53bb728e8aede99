use async_trait::async_trait;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use thiserror::Error;

use crate::infra::config::SmtpConfig;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MailError(pub String);

/// A fully rendered message ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Submits mail over SMTP with `mail-send`, one connection per message.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        SmtpMailer { config }
    }

    pub fn sender(&self) -> &str {
        &self.config.user
    }

    fn client(&self) -> SmtpClientBuilder<String> {
        let builder = SmtpClientBuilder::new(self.config.host.clone(), self.config.port)
            .implicit_tls(self.config.implicit_tls)
            .credentials((self.config.user.clone(), self.config.pass.clone()));
        if self.config.allow_invalid_certs {
            builder.allow_invalid_certs()
        } else {
            builder
        }
    }

    /// Connects, authenticates and quits. Used once at startup so a broken
    /// SMTP setup shows up in the logs before the first booking arrives.
    pub async fn verify(&self) -> Result<(), MailError> {
        let client = self.client().connect().await.map_err(|e| MailError(e.to_string()))?;
        client.quit().await.map_err(|e| MailError(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let mut message = MessageBuilder::new()
            .from((email.from_name.as_str(), self.config.user.as_str()))
            .to(email.to.as_str())
            .subject(email.subject.as_str())
            .text_body(email.text_body.as_str())
            .html_body(email.html_body.as_str());
        if let Some(reply_to) = email.reply_to.as_deref() {
            message = message.reply_to(reply_to);
        }

        self.client()
            .connect()
            .await
            .map_err(|e| MailError(format!("SMTP connection failed: {e}")))?
            .send(message)
            .await
            .map_err(|e| MailError(format!("SMTP submission failed: {e}")))?;

        tracing::info!(to = %email.to, subject = %email.subject, "email submitted");
        Ok(())
    }
}
