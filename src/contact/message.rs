use super::submission::ContactSubmission;
use crate::mailer::OutgoingMail;

/// Sender, recipient and branding used when composing contact emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailIdentity {
    pub site_name: String,
    pub from_address: String,
    pub contact_address: String,
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn attachment_list(submission: &ContactSubmission) -> String {
    if submission.attachments.is_empty() {
        "None".to_string()
    } else {
        submission.attachment_names().join(", ")
    }
}

/// Notification for the business inbox, carrying the visitor's attachments.
/// Only validated submissions reach this point, so consent is always recorded
/// as given.
pub fn business_notification(
    submission: &ContactSubmission,
    identity: &MailIdentity,
    sent_at: &str,
) -> OutgoingMail {
    let attachments = attachment_list(submission);

    let text_body = format!(
        "New message from the contact form\n\n\
         Name: {}\n\
         Phone: {}\n\
         Email: {}\n\
         Data processing consent: Yes\n\
         Attachments: {attachments}\n\n\
         Message:\n{}\n\n\
         Sent automatically from the {} website at {sent_at}\n",
        submission.full_name.trim(),
        submission.phone.trim(),
        submission.email.trim(),
        submission.message,
        identity.site_name,
    );

    let html_body = format!(
        "<h2>New message from the contact form</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Data processing consent:</strong> Yes</p>\
         <p><strong>Attachments:</strong> {}</p>\
         <h3>Message:</h3>\
         <p style=\"white-space: pre-wrap;\">{}</p>\
         <p><small>Sent automatically from the {} website at {sent_at}</small></p>",
        escape_html(submission.full_name.trim()),
        escape_html(submission.phone.trim()),
        escape_html(submission.email.trim()),
        escape_html(&attachments),
        escape_html(&submission.message),
        escape_html(&identity.site_name),
    );

    OutgoingMail {
        from: identity.from_address.clone(),
        to: identity.contact_address.clone(),
        subject: format!(
            "New message from {} - {} contact form",
            submission.full_name.trim(),
            identity.site_name
        ),
        text_body,
        html_body,
        attachments: submission.attachments.clone(),
    }
}

/// Acknowledgement for the visitor, echoing their message and attachments.
pub fn confirmation(submission: &ContactSubmission, identity: &MailIdentity) -> OutgoingMail {
    let attachments = attachment_list(submission);

    let text_body = format!(
        "Thank you for your message!\n\n\
         Dear {},\n\n\
         we have received your message and will get back to you as soon as possible.\n\n\
         Your message:\n{}\n\n\
         Attachments: {attachments}\n\n\
         Email: {}\n\n\
         Kind regards,\n{}\n\n\
         This is an automated message, please do not reply.\n",
        submission.full_name.trim(),
        submission.message,
        identity.contact_address,
        identity.site_name,
    );

    let html_body = format!(
        "<h2>Thank you for your message!</h2>\
         <p>Dear {},</p>\
         <p>we have received your message and will get back to you as soon as possible.</p>\
         <h3>Your message:</h3>\
         <p style=\"white-space: pre-wrap;\">{}</p>\
         <p><strong>Attachments:</strong> {}</p>\
         <p><strong>Email:</strong> <a href=\"mailto:{contact}\">{contact}</a></p>\
         <p>Kind regards,<br><strong>{}</strong></p>\
         <p><small>This is an automated message, please do not reply.</small></p>",
        escape_html(submission.full_name.trim()),
        escape_html(&submission.message),
        escape_html(&attachments),
        escape_html(&identity.site_name),
        contact = escape_html(&identity.contact_address),
    );

    OutgoingMail {
        from: identity.from_address.clone(),
        to: submission.email.trim().to_string(),
        subject: format!("{} - message received", identity.site_name),
        text_body,
        html_body,
        attachments: submission.attachments.clone(),
    }
}
