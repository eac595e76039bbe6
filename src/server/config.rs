use std::env;

/// All credentials and endpoints the backend talks to, resolved once at
/// startup and injected through `AppState`. Route code never reads the
/// environment directly.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub frontend_url: String,
    pub jwt_secret: String,
    /// 32-byte hex key used to encrypt bot-tenant API keys at rest.
    pub secret_encryption_key: String,

    pub bot_platform_url: String,
    pub bot_platform_admin_key: String,

    pub payments_api_url: String,
    pub payments_secret_key: String,
    pub payments_webhook_secret: String,

    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub admin_inbox: String,
    /// Shared token expected on the inbound-email incident intake endpoint.
    pub inbound_email_token: String,

    pub invoice_currency: String,
    pub invoice_tax_rate_percent: f64,
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} must be set"))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let invoice_tax_rate_percent = optional("INVOICE_TAX_RATE_PERCENT", "0")
            .parse::<f64>()
            .map_err(|_| "INVOICE_TAX_RATE_PERCENT must be a number".to_string())?;

        Ok(ServerConfig {
            bind_addr: optional("BIND_ADDR", "0.0.0.0:8080"),
            database_url: required("DATABASE_URL")?,
            frontend_url: required("FRONTEND_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            secret_encryption_key: required("SECRET_ENCRYPTION_KEY")?,

            bot_platform_url: required("BOT_PLATFORM_URL")?,
            bot_platform_admin_key: required("BOT_PLATFORM_ADMIN_KEY")?,

            payments_api_url: required("PAYMENTS_API_URL")?,
            payments_secret_key: required("PAYMENTS_SECRET_KEY")?,
            payments_webhook_secret: required("PAYMENTS_WEBHOOK_SECRET")?,

            email_api_url: required("EMAIL_API_URL")?,
            email_api_key: required("EMAIL_API_KEY")?,
            email_from: required("EMAIL_FROM")?,
            admin_inbox: required("ADMIN_INBOX")?,
            inbound_email_token: required("INBOUND_EMAIL_TOKEN")?,

            invoice_currency: optional("INVOICE_CURRENCY", "usd"),
            invoice_tax_rate_percent,
        })
    }
}
