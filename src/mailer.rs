use crate::config::{ConfigurationError, SmtpSettings};
use crate::contact::submission::{Attachment, DEFAULT_CONTENT_TYPE};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// A fully composed email, independent of the transport that sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Single-attempt delivery. Retrying is left to the caller.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, ConfigurationError> {
        let builder = if settings.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| ConfigurationError(format!("invalid SMTP host {}: {e}", settings.host)))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        log::info!(
            "SMTP transport ready: {}:{} ({})",
            settings.host,
            settings.port,
            if settings.implicit_tls() {
                "implicit TLS"
            } else {
                "STARTTLS"
            }
        );

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;
        log::info!("Sent '{}' to {}", mail.subject, mail.to);
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| TransportError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

fn content_type(raw: &str) -> Result<ContentType, TransportError> {
    ContentType::parse(raw)
        .or_else(|_| ContentType::parse(DEFAULT_CONTENT_TYPE))
        .map_err(|e| TransportError::Build(e.to_string()))
}

pub fn build_message(mail: &OutgoingMail) -> Result<Message, TransportError> {
    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        mail.text_body.clone(),
        mail.html_body.clone(),
    ));

    for attachment in &mail.attachments {
        body = body.singlepart(
            MailAttachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type(&attachment.content_type)?),
        );
    }

    Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .multipart(body)
        .map_err(|e| TransportError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mail() -> OutgoingMail {
        OutgoingMail {
            from: "noreply@crescere.sk".to_string(),
            to: "tomas@crescere.sk".to_string(),
            subject: "New message".to_string(),
            text_body: "Hello".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            attachments: vec![Attachment::new(
                "brief.txt",
                Some("text/plain"),
                b"project brief".to_vec(),
            )],
        }
    }

    #[test]
    fn test_build_message_with_attachment() {
        let message = build_message(&mail()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: New message"));
        assert!(raw.contains("brief.txt"));
        assert!(raw.contains("multipart/mixed"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let mut mail = mail();
        mail.to = "not an address".to_string();

        assert!(matches!(
            build_message(&mail),
            Err(TransportError::Address { .. })
        ));
    }

    #[test]
    fn test_unknown_content_type_falls_back() {
        let mut mail = mail();
        mail.attachments[0].content_type = "definitely not a mime type".to_string();

        assert!(build_message(&mail).is_ok());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_for_both_tls_modes() {
        let mut settings = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_address: "noreply@example.com".to_string(),
            contact_address: "office@example.com".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(SmtpMailer::new(&settings).is_ok());

        settings.port = 465;
        assert!(SmtpMailer::new(&settings).is_ok());
    }
}
