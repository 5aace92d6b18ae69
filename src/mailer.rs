use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Failed to connect to SMTP relay: {0}")]
    Relay(lettre::transport::smtp::Error),

    /// Refusal reported by a transport that does not speak SMTP, such as an
    /// HTTP mail API or an in-memory double.
    #[error("Mail transport rejected message: {0}")]
    Rejected(String),
}

/// Outbound mail transport.
///
/// One instance is built at startup and shared by every request.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailerError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self, MailerError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_relay)
            .map_err(MailerError::Relay)?
            .credentials(creds)
            .build();

        tracing::info!("SMTP transport configured for relay '{}'", config.smtp_relay);

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        let response = self.transport.send(message).await?;
        tracing::debug!("SMTP relay answered with code {}", response.code());
        Ok(())
    }
}
