use crate::{
    config::Config,
    dto::{SendEmailRequest, SendEmailResponse},
    mailer::{Mailer, MailerError},
};

use lettre::{
    Address, Message,
    message::{Mailbox, MultiPart},
};
use uuid::Uuid;

use std::sync::Arc;

pub struct EmailService {
    sender: Mailbox,
    recipient: Mailbox,
    strict_validation: bool,
    mailer: Arc<dyn Mailer>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("subject must not be empty")]
    MissingSubject,

    #[error("message must not be empty")]
    MissingMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailServiceError {
    #[error("Invalid email address format: {0}")]
    AddressFormat(#[from] lettre::address::AddressError),

    #[error("Failed to build email message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error(transparent)]
    Transport(#[from] MailerError),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
}

impl EmailService {
    /// Resolves sender and recipient mailboxes once so that a bad address
    /// fails at startup rather than on the first request.
    pub fn new(config: &Config, mailer: Arc<dyn Mailer>) -> Result<Self, EmailServiceError> {
        let sender_address: Address = config.sender.parse()?;
        let recipient: Mailbox = config.recipient.parse()?;

        Ok(Self {
            sender: Mailbox::new(Some(config.sender_name.clone()), sender_address),
            recipient,
            strict_validation: config.strict_validation,
            mailer,
        })
    }

    pub async fn send_email(
        &self,
        request: SendEmailRequest,
    ) -> Result<SendEmailResponse, EmailServiceError> {
        if self.strict_validation {
            validate(&request)?;
        }

        let (id, email) = self.compose(&request)?;

        tracing::info!(
            "Sending email to '{}' with subject '{}'",
            self.recipient,
            request.subject
        );

        self.mailer.send(email).await?;

        tracing::info!("Message {} to {} sent successfully", id, self.recipient);

        Ok(SendEmailResponse::sent(id))
    }

    fn compose(&self, request: &SendEmailRequest) -> Result<(String, Message), EmailServiceError> {
        let id = format!("<{}@{}>", Uuid::new_v4(), self.sender.email.domain());

        let email = Message::builder()
            .message_id(Some(id.clone()))
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(request.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                request.message.clone(),
                render_html(&request.message),
            ))?;

        Ok((id, email))
    }
}

fn validate(request: &SendEmailRequest) -> Result<(), ValidationError> {
    if request.subject.trim().is_empty() {
        return Err(ValidationError::MissingSubject);
    }
    if request.message.trim().is_empty() {
        return Err(ValidationError::MissingMessage);
    }
    Ok(())
}

fn render_html(message: &str) -> String {
    format!("<p>{}</p>", html_escape::encode_text(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: Message) -> Result<(), MailerError> {
            if self.fail {
                return Err(MailerError::Rejected("535 authentication failed".to_string()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn config(strict_validation: bool) -> Config {
        Config {
            sender: "relay@vibae.app".to_string(),
            sender_name: "Vibae".to_string(),
            smtp_relay: "smtp.example.com".to_string(),
            smtp_username: "relay@vibae.app".to_string(),
            smtp_pass: "secret".to_string(),
            recipient: "inbox@vibae.app".to_string(),
            allowed_origins: Vec::new(),
            port: 4000,
            strict_validation,
        }
    }

    fn request(subject: &str, message: &str) -> SendEmailRequest {
        SendEmailRequest {
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn render_html_wraps_in_paragraph() {
        assert_eq!(render_html("World"), "<p>World</p>");
        assert_eq!(render_html(""), "<p></p>");
        assert_eq!(
            render_html("<script>alert(1) & more</script>"),
            "<p>&lt;script&gt;alert(1) &amp; more&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn validate_rejects_blank_fields() {
        assert_eq!(
            validate(&request("  ", "body")),
            Err(ValidationError::MissingSubject)
        );
        assert_eq!(
            validate(&request("Hello", "")),
            Err(ValidationError::MissingMessage)
        );
        assert_eq!(validate(&request("Hello", "World")), Ok(()));
    }

    #[test]
    fn new_rejects_bad_recipient() {
        let mut cfg = config(false);
        cfg.recipient = "not an address".to_string();
        let result = EmailService::new(&cfg, Arc::new(RecordingMailer::default()));
        assert!(matches!(result, Err(EmailServiceError::AddressFormat(_))));
    }

    #[test]
    fn compose_targets_fixed_recipient() {
        let service = EmailService::new(&config(false), Arc::new(RecordingMailer::default()))
            .unwrap();
        let (id, email) = service.compose(&request("Hello", "World")).unwrap();

        assert!(id.starts_with('<') && id.ends_with("@vibae.app>"));
        let to: Vec<String> = email.envelope().to().iter().map(ToString::to_string).collect();
        assert_eq!(to, vec!["inbox@vibae.app"]);

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Vibae <relay@vibae.app>"));
        assert!(raw.contains("<p>World</p>"));
        assert!(raw.contains(&format!("Message-ID: {id}")));
    }

    #[test]
    fn compose_assigns_fresh_ids() {
        let service = EmailService::new(&config(false), Arc::new(RecordingMailer::default()))
            .unwrap();
        let (first, _) = service.compose(&request("a", "b")).unwrap();
        let (second, _) = service.compose(&request("a", "b")).unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn send_email_dispatches_once() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = EmailService::new(&config(false), mailer.clone()).unwrap();

        let response = service.send_email(request("Hello", "World")).await.unwrap();

        assert!(response.success);
        assert!(response.id.is_some_and(|id| !id.is_empty()));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lenient_mode_sends_empty_message() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = EmailService::new(&config(false), mailer.clone()).unwrap();

        let response = service.send_email(request("Hello", "")).await.unwrap();

        assert!(response.success);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn strict_mode_rejects_before_sending() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = EmailService::new(&config(true), mailer.clone()).unwrap();

        let err = service.send_email(request("Hello", "")).await.unwrap_err();

        assert!(matches!(
            err,
            EmailServiceError::Validation(ValidationError::MissingMessage)
        ));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_error_text() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let service = EmailService::new(&config(false), mailer).unwrap();

        let err = service.send_email(request("Hello", "World")).await.unwrap_err();

        assert!(matches!(err, EmailServiceError::Transport(_)));
        assert!(err.to_string().contains("535 authentication failed"));
    }
}
