//! Payment processor client. Creates hosted checkout sessions (subscription
//! or one-time) and billing-portal sessions. Form-encoded API, bearer secret
//! key, idempotency key per request. Subscription state flows back through
//! the webhook route, not through this client.

use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use super::{BridgeError, ensure_success};

const SERVICE: &str = "payment processor";

pub struct PaymentsClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription,
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

pub struct CheckoutParams {
    pub mode: CheckoutMode,
    pub amount_minor: i64,
    pub currency: String,
    pub product_name: String,
    /// Opaque reference carried through to the webhook,
    /// "client:{id}:plan:{id}" for plan subscriptions or
    /// "client:{id}:asset:{id}:feature:{key}" for feature purchases.
    pub client_reference: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Form pairs for a checkout-session request.
pub fn checkout_form(params: &CheckoutParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), params.mode.as_str().to_string()),
        ("amount".to_string(), params.amount_minor.to_string()),
        ("currency".to_string(), params.currency.clone()),
        ("product_name".to_string(), params.product_name.clone()),
        (
            "client_reference_id".to_string(),
            params.client_reference.clone(),
        ),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
    ];
    if let Some(email) = &params.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    form
}

impl PaymentsClient {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret_key,
        }
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BridgeError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&checkout_form(params))
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        response.json().await.map_err(|e| BridgeError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BridgeError> {
        let url = format!(
            "{}/v1/billing_portal/sessions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        response.json().await.map_err(|e| BridgeError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CheckoutParams {
        CheckoutParams {
            mode: CheckoutMode::Subscription,
            amount_minor: 30000,
            currency: "usd".to_string(),
            product_name: "Standard Retainer".to_string(),
            client_reference: "client:7".to_string(),
            customer_email: None,
            success_url: "https://example.com/ok".to_string(),
            cancel_url: "https://example.com/cancel".to_string(),
        }
    }

    #[test]
    fn subscription_checkout_form_carries_amount_and_mode() {
        let form = checkout_form(&params());
        assert!(form.contains(&("mode".to_string(), "subscription".to_string())));
        assert!(form.contains(&("amount".to_string(), "30000".to_string())));
        assert!(!form.iter().any(|(k, _)| k == "customer_email"));
    }

    #[test]
    fn email_is_included_when_present() {
        let mut p = params();
        p.customer_email = Some("ops@example.com".to_string());
        p.mode = CheckoutMode::Payment;
        let form = checkout_form(&p);
        assert!(form.contains(&("mode".to_string(), "payment".to_string())));
        assert!(form.contains(&("customer_email".to_string(), "ops@example.com".to_string())));
    }
}
