use super::submission::ValidationError;
use crate::config::ConfigurationError;
use crate::mailer::TransportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const CONFIGURATION_MESSAGE: &str = "The mail service is not configured";
pub const DELIVERY_MESSAGE: &str =
    "An error occurred while sending your message. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to deliver message: {0}")]
    Delivery(#[from] TransportError),
}

impl ContactError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactError::Validation(_) => StatusCode::BAD_REQUEST,
            ContactError::Configuration(_) | ContactError::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the visitor. Server-side details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ContactError::Validation(e) => e.to_string(),
            ContactError::Configuration(_) => CONFIGURATION_MESSAGE.to_string(),
            ContactError::Delivery(_) => DELIVERY_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        match &self {
            ContactError::Validation(e) => log::debug!("Contact form rejected: {e}"),
            ContactError::Configuration(e) => log::error!("Contact form unavailable: {e}"),
            ContactError::Delivery(e) => log::error!("Error sending email: {e}"),
        }

        (
            self.status_code(),
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
