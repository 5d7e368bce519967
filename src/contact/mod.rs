pub mod error;
pub mod message;
pub mod service;
pub mod submission;

pub use error::ContactError;
pub use message::MailIdentity;
pub use service::{ContactResponse, ContactService};
pub use submission::{Attachment, ContactSubmission, ValidationError};
