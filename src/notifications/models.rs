use serde::Serialize;

/// A rendered transactional email, ready for the sender.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}
