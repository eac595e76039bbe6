use std::sync::Arc;

use tera::{Context, Tera};
use thiserror::Error;

use super::models::EmailMessage;
use super::senders::{NotificationSender, SenderError};
use crate::db::entities::{incident, invoice};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Templating error: {0}")]
    TemplatingError(String),
    #[error("Sender error: {0}")]
    SenderError(#[from] SenderError),
}

const INCIDENT_CREATED_BODY: &str = r#"<h2>New incident for {{ client_name }}</h2>
<p><strong>{{ title }}</strong> (severity: {{ severity }}, source: {{ source }})</p>
{% if body %}<p>{{ body }}</p>{% endif %}
{% if reporter_email %}<p>Reported by: {{ reporter_email }}</p>{% endif %}"#;

const INVOICE_ISSUED_BODY: &str = r#"<h2>Invoice {{ number }}</h2>
<p>Your invoice for {{ total }} {{ currency }} has been issued.</p>
<p>Subtotal: {{ subtotal }} · Tax: {{ tax }}</p>"#;

const WELCOME_BODY: &str = r#"<h2>Welcome aboard, {{ client_name }}!</h2>
<p>Your retainer is active. Reply to this email any time you need us.</p>"#;

fn format_minor(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
}

/// Dispatches transactional email. Failures here must never fail the
/// request that triggered them; callers log and move on.
pub struct NotificationService {
    sender: Arc<dyn NotificationSender>,
    from: String,
    admin_inbox: String,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>, from: String, admin_inbox: String) -> Self {
        Self {
            sender,
            from,
            admin_inbox,
        }
    }

    fn render(template: &str, context: &Context) -> Result<String, NotificationError> {
        Tera::one_off(template, context, true)
            .map_err(|e| NotificationError::TemplatingError(e.to_string()))
    }

    /// Notifies the admin inbox about a freshly created incident.
    pub async fn incident_created(
        &self,
        incident: &incident::Model,
        client_name: &str,
    ) -> Result<(), NotificationError> {
        let mut context = Context::new();
        context.insert("client_name", client_name);
        context.insert("title", &incident.title);
        context.insert("severity", &incident.severity);
        context.insert("source", &incident.source);
        context.insert("body", &incident.body);
        context.insert("reporter_email", &incident.reporter_email);

        let message = EmailMessage {
            to: self.admin_inbox.clone(),
            subject: format!("[incident] {} - {}", client_name, incident.title),
            html: Self::render(INCIDENT_CREATED_BODY, &context)?,
        };
        self.sender.send(&self.from, &message).await?;
        Ok(())
    }

    /// Sends the issued invoice summary to the client's contact address.
    pub async fn invoice_issued(
        &self,
        invoice: &invoice::Model,
        contact_email: &str,
    ) -> Result<(), NotificationError> {
        let mut context = Context::new();
        context.insert("number", &invoice.number);
        context.insert("currency", &invoice.currency);
        context.insert("subtotal", &format_minor(invoice.subtotal_minor));
        context.insert("tax", &format_minor(invoice.tax_minor));
        context.insert("total", &format_minor(invoice.total_minor));

        let message = EmailMessage {
            to: contact_email.to_string(),
            subject: format!("Invoice {} from your retainer team", invoice.number),
            html: Self::render(INVOICE_ISSUED_BODY, &context)?,
        };
        self.sender.send(&self.from, &message).await?;
        Ok(())
    }

    pub async fn welcome(
        &self,
        client_name: &str,
        contact_email: &str,
    ) -> Result<(), NotificationError> {
        let mut context = Context::new();
        context.insert("client_name", client_name);

        let message = EmailMessage {
            to: contact_email.to_string(),
            subject: "Your retainer is live".to_string(),
            html: Self::render(WELCOME_BODY, &context)?,
        };
        self.sender.send(&self.from, &message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, _from: &str, message: &EmailMessage) -> Result<(), SenderError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn welcome_email_renders_client_name() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let service = NotificationService::new(
            sender.clone(),
            "team@example.com".to_string(),
            "admin@example.com".to_string(),
        );

        service
            .welcome("Acme Corp", "ops@acme.test")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@acme.test");
        assert!(sent[0].html.contains("Acme Corp"));
    }

    #[test]
    fn minor_units_format_as_decimal() {
        assert_eq!(format_minor(30000), "300.00");
        assert_eq!(format_minor(125050), "1250.50");
        assert_eq!(format_minor(5), "0.05");
    }
}
