//! Capability guard. Capabilities are coarse string tags checked before any
//! privileged operation; the role mapping is static configuration.

use crate::web::error::AppError;
use crate::web::models::AuthenticatedUser;

pub const CONTENT_READ: &str = "content:read";
pub const CONTENT_WRITE: &str = "content:write";
pub const SYSTEM_READ: &str = "system:read";
pub const SYSTEM_WRITE: &str = "system:write";
pub const INCIDENTS_READ: &str = "incidents:read";
pub const INCIDENTS_WRITE: &str = "incidents:write";
pub const BILLING_CHECKOUT: &str = "billing:checkout";
pub const BILLING_PORTAL: &str = "billing:portal";
pub const BILLING_MANAGE: &str = "billing:manage";
pub const BOT_PROVISION: &str = "bot:provision";
pub const BOT_FEATURES_READ: &str = "bot:features:read";
pub const BOT_FEATURES_TOGGLE: &str = "bot:features:toggle";
pub const BOT_SYNC: &str = "bot:sync";

const ADMIN_CAPABILITIES: &[&str] = &[
    CONTENT_READ,
    CONTENT_WRITE,
    SYSTEM_READ,
    SYSTEM_WRITE,
    INCIDENTS_READ,
    INCIDENTS_WRITE,
    BILLING_CHECKOUT,
    BILLING_PORTAL,
    BILLING_MANAGE,
    BOT_PROVISION,
    BOT_FEATURES_READ,
    BOT_FEATURES_TOGGLE,
    BOT_SYNC,
];

const STAFF_CAPABILITIES: &[&str] = &[
    CONTENT_READ,
    CONTENT_WRITE,
    SYSTEM_READ,
    INCIDENTS_READ,
    INCIDENTS_WRITE,
    BOT_FEATURES_READ,
];

const CLIENT_CAPABILITIES: &[&str] = &[
    CONTENT_READ,
    BILLING_CHECKOUT,
    BILLING_PORTAL,
    BOT_FEATURES_READ,
    BOT_FEATURES_TOGGLE,
];

/// Permitted capability set for a role. Unknown roles get nothing.
pub fn role_capabilities(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => ADMIN_CAPABILITIES,
        "staff" => STAFF_CAPABILITIES,
        "client" => CLIENT_CAPABILITIES,
        _ => &[],
    }
}

pub fn has_capability(role: &str, capability: &str) -> bool {
    role_capabilities(role).contains(&capability)
}

/// Denies with 403 unless the caller's role carries `capability`. Handlers
/// call this before any side-effecting code runs.
pub fn require_capability(user: &AuthenticatedUser, capability: &str) -> Result<(), AppError> {
    if has_capability(&user.role, capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Missing capability: {capability}"
        )))
    }
}

/// Client-role users may only act on their own client. Admin and staff pass.
pub fn require_client_scope(user: &AuthenticatedUser, client_id: i32) -> Result<(), AppError> {
    match user.role.as_str() {
        "admin" | "staff" => Ok(()),
        _ => match user.client_id {
            Some(own) if own == client_id => Ok(()),
            _ => Err(AppError::Forbidden(
                "Operation not permitted for this client".to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, client_id: Option<i32>) -> AuthenticatedUser {
        AuthenticatedUser {
            id: 1,
            username: "t".to_string(),
            role: role.to_string(),
            client_id,
        }
    }

    #[test]
    fn admin_has_every_capability() {
        for cap in ADMIN_CAPABILITIES {
            assert!(has_capability("admin", cap), "admin missing {cap}");
        }
    }

    #[test]
    fn staff_cannot_toggle_bot_features() {
        assert!(!has_capability("staff", BOT_FEATURES_TOGGLE));
        let err = require_capability(&user("staff", None), BOT_FEATURES_TOGGLE).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn client_cannot_write_content_or_provision() {
        assert!(require_capability(&user("client", Some(7)), CONTENT_WRITE).is_err());
        assert!(require_capability(&user("client", Some(7)), BOT_PROVISION).is_err());
        assert!(require_capability(&user("client", Some(7)), BOT_FEATURES_TOGGLE).is_ok());
    }

    #[test]
    fn unknown_role_gets_nothing() {
        assert!(role_capabilities("superuser").is_empty());
        assert!(require_capability(&user("superuser", None), CONTENT_READ).is_err());
    }

    #[test]
    fn client_scope_restricts_to_own_client() {
        assert!(require_client_scope(&user("client", Some(7)), 7).is_ok());
        assert!(require_client_scope(&user("client", Some(7)), 8).is_err());
        assert!(require_client_scope(&user("client", None), 7).is_err());
        assert!(require_client_scope(&user("staff", None), 7).is_ok());
        assert!(require_client_scope(&user("admin", None), 7).is_ok());
    }
}
