use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{NotificationSender, SenderError};
use crate::notifications::models::EmailMessage;

/// Sends transactional mail through an HTTP email API (Resend-style JSON
/// endpoint, bearer key).
pub struct EmailApiSender {
    client: Client,
    api_url: String,
    api_key: String,
}

impl EmailApiSender {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl NotificationSender for EmailApiSender {
    async fn send(&self, from: &str, message: &EmailMessage) -> Result<(), SenderError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": from,
                "to": message.to,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Email API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
