use async_trait::async_trait;
use thiserror::Error;

use crate::notifications::models::EmailMessage;

pub mod email_api;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Network or request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Outbound delivery seam; production uses the HTTP email API, tests can
/// substitute a recorder.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, from: &str, message: &EmailMessage) -> Result<(), SenderError>;
}
