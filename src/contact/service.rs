use super::error::ContactError;
use super::message::{business_notification, confirmation, MailIdentity};
use super::submission::ContactSubmission;
use crate::config::{Config, ConfigurationError};
use crate::mailer::{MailTransport, SmtpMailer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SUCCESS_MESSAGE: &str = "Your message has been sent successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

struct MailRoute {
    transport: Arc<dyn MailTransport>,
    identity: MailIdentity,
}

/// Validates contact submissions and sends the two emails for each one.
///
/// The business notification always goes first; if it fails the visitor's
/// confirmation is never attempted. Each call sends for real, so a retried
/// submission produces duplicate emails.
pub struct ContactService {
    route: Result<MailRoute, ConfigurationError>,
}

impl ContactService {
    pub fn new(transport: Arc<dyn MailTransport>, identity: MailIdentity) -> Self {
        Self {
            route: Ok(MailRoute {
                transport,
                identity,
            }),
        }
    }

    /// Service that validates submissions but reports every valid one as a
    /// configuration error.
    pub fn unconfigured(error: ConfigurationError) -> Self {
        Self { route: Err(error) }
    }

    pub fn from_config(config: &Config) -> Self {
        let settings = match config.smtp_settings() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Contact form disabled until SMTP is configured: {e}");
                return Self::unconfigured(e);
            }
        };

        match SmtpMailer::new(&settings) {
            Ok(mailer) => Self::new(
                Arc::new(mailer),
                MailIdentity {
                    site_name: config.site_name.clone(),
                    from_address: settings.from_address.clone(),
                    contact_address: settings.contact_address.clone(),
                },
            ),
            Err(e) => {
                log::error!("Failed to create SMTP transport: {e}");
                Self::unconfigured(e)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.route.is_ok()
    }

    pub async fn submit(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactResponse, ContactError> {
        submission.validate()?;

        let route = self.route.as_ref().map_err(|e| e.clone())?;

        let sent_at = chrono::Local::now().format("%d.%m.%Y %H:%M:%S").to_string();
        let notification = business_notification(submission, &route.identity, &sent_at);
        route.transport.send(&notification).await?;

        let acknowledgement = confirmation(submission, &route.identity);
        route.transport.send(&acknowledgement).await?;

        log::info!(
            "Contact form message from {} delivered ({} attachment(s))",
            submission.email.trim(),
            submission.attachments.len()
        );

        Ok(ContactResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        })
    }
}
