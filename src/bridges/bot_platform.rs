//! REST client for the external bot platform: tenant provisioning, guild
//! registration, feature toggles and the feature-set fetch used by sync.
//! Tenant-scoped calls authenticate with the per-tenant `X-Api-Key`.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{BridgeError, ensure_success};

const SERVICE: &str = "bot platform";
const API_KEY_HEADER: &str = "X-Api-Key";

pub struct BotPlatformClient {
    http: Client,
    base_url: String,
    admin_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionedTenant {
    pub tenant_id: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct FeatureList {
    features: Vec<String>,
}

fn guild_url(base: &str, tenant_id: &str, guild_id: &str) -> String {
    format!("{}/v1/tenants/{tenant_id}/guilds/{guild_id}", base.trim_end_matches('/'))
}

impl BotPlatformClient {
    pub fn new(base_url: String, admin_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_key,
        }
    }

    /// Creates a tenant for a client. Admin-keyed; returns the tenant id and
    /// the per-tenant API key used for every subsequent call.
    pub async fn provision_tenant(&self, name: &str) -> Result<ProvisionedTenant, BridgeError> {
        let url = format!("{}/v1/tenants", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.admin_key)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        response.json().await.map_err(|e| BridgeError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    pub async fn register_guild(
        &self,
        api_key: &str,
        tenant_id: &str,
        guild_id: &str,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/v1/tenants/{tenant_id}/guilds",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&json!({ "guild_id": guild_id }))
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    pub async fn enable_feature(
        &self,
        api_key: &str,
        tenant_id: &str,
        guild_id: &str,
        config_key: &str,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/features/{config_key}",
            guild_url(&self.base_url, tenant_id, guild_id)
        );
        let response = self
            .http
            .put(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    pub async fn disable_feature(
        &self,
        api_key: &str,
        tenant_id: &str,
        guild_id: &str,
        config_key: &str,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/features/{config_key}",
            guild_url(&self.base_url, tenant_id, guild_id)
        );
        let response = self
            .http
            .delete(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    /// The platform's view of which config-keys are enabled for a guild.
    /// Source of truth during sync.
    pub async fn fetch_enabled_features(
        &self,
        api_key: &str,
        tenant_id: &str,
        guild_id: &str,
    ) -> Result<Vec<String>, BridgeError> {
        let url = format!(
            "{}/features",
            guild_url(&self.base_url, tenant_id, guild_id)
        );
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        let list: FeatureList = response.json().await.map_err(|e| BridgeError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        Ok(list.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_url_shape() {
        assert_eq!(
            guild_url("https://bots.example.com/", "t_1", "g_2"),
            "https://bots.example.com/v1/tenants/t_1/guilds/g_2"
        );
    }
}
