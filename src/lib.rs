pub mod config;
pub mod consent;
pub mod contact;
pub mod mailer;
pub mod server;

pub use config::{Config, ConfigurationError, SmtpSettings};
pub use consent::{
    Category, ConsentController, ConsentGate, ConsentRecord, ConsentSelection, ConsentState,
    ConsentStore, TrackingFacade,
};
pub use contact::{ContactError, ContactService, ContactSubmission};
pub use mailer::{MailTransport, OutgoingMail, SmtpMailer};
pub use server::{router, start_server, AppState};
