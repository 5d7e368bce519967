use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: &str, content_type: Option<&str>, data: Vec<u8>) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }
}

/// One contact-form submission as received from the site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSubmission {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub message: String,
    /// Raw `gdprConsent` form value (`"true"` when the box was ticked).
    pub gdpr_consent: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("All fields are required ({0} is missing)")]
    MissingField(&'static str),
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Consent to personal data processing is required")]
    ConsentNotGiven,
    #[error("Malformed form payload: {0}")]
    MalformedPayload(String),
}

impl ContactSubmission {
    pub fn consent_given(&self) -> bool {
        self.gdpr_consent.trim().eq_ignore_ascii_case("true")
    }

    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(|attachment| attachment.filename.as_str())
            .collect()
    }

    /// Required fields first, then the email shape, then the consent value.
    ///
    /// The consent value must be `true` (any case). Any other non-empty value,
    /// `false` included, is refused rather than forwarded as a declined consent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("fullName", &self.full_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("message", &self.message),
            ("gdprConsent", &self.gdpr_consent),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(ValidationError::InvalidEmail);
        }

        if !self.consent_given() {
            return Err(ValidationError::ConsentNotGiven);
        }

        Ok(())
    }
}
