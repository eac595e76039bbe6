//! Billing bridge: hosted checkout and portal sessions on the way out,
//! webhook events on the way back. The opaque `client_reference` string is
//! the only state carried through the processor, so its format is pinned
//! down here with a parser and tests.

use axum::{
    Json, Router,
    extract::{Extension, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bridges::payments::{CheckoutMode, CheckoutParams};
use crate::db::enums::{EntitlementStatus, SubscriptionStatus};
use crate::db::services::{
    asset_service, client_service, entitlement_service, feature_service, plan_service,
    subscription_service,
};
use crate::services::pricing_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

pub fn create_billing_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/portal", post(create_portal))
}

/// What a completed checkout pays for, round-tripped through the processor
/// as an opaque reference string.
#[derive(Debug, PartialEq, Eq)]
pub enum CheckoutRef {
    Plan { client_id: i32, plan_id: i32 },
    Feature {
        client_id: i32,
        asset_id: i32,
        feature_key: String,
    },
}

pub fn plan_reference(client_id: i32, plan_id: i32) -> String {
    format!("client:{client_id}:plan:{plan_id}")
}

pub fn feature_reference(client_id: i32, asset_id: i32, feature_key: &str) -> String {
    format!("client:{client_id}:asset:{asset_id}:feature:{feature_key}")
}

pub fn parse_reference(reference: &str) -> Option<CheckoutRef> {
    let parts: Vec<&str> = reference.split(':').collect();
    match parts.as_slice() {
        ["client", client, "plan", plan] => Some(CheckoutRef::Plan {
            client_id: client.parse().ok()?,
            plan_id: plan.parse().ok()?,
        }),
        ["client", client, "asset", asset, "feature", key] if !key.is_empty() => {
            Some(CheckoutRef::Feature {
                client_id: client.parse().ok()?,
                asset_id: asset.parse().ok()?,
                feature_key: (*key).to_string(),
            })
        }
        _ => None,
    }
}

#[derive(Deserialize)]
struct CheckoutRequest {
    client_id: i32,
    plan_id: Option<i32>,
    asset_id: Option<i32>,
    feature_key: Option<String>,
}

async fn create_checkout(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BILLING_CHECKOUT)?;
    authz::require_client_scope(&auth_user, payload.client_id)?;

    let client = client_service::get_client(&app_state.db, payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let (mode, amount_minor, product_name, reference) =
        match (payload.plan_id, payload.asset_id, payload.feature_key) {
            (Some(plan_id), None, None) => {
                let plan = plan_service::get_plan(&app_state.db, plan_id)
                    .await?
                    .filter(|p| p.is_active)
                    .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;
                let amount = pricing_service::parse_price_minor(&plan.price).ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Plan {} has an unparseable price",
                        plan.id
                    ))
                })?;
                (
                    CheckoutMode::Subscription,
                    amount,
                    format!("{} Retainer", plan.name),
                    plan_reference(client.id, plan.id),
                )
            }
            (None, Some(asset_id), Some(feature_key)) => {
                let asset = asset_service::get_asset(&app_state.db, asset_id)
                    .await?
                    .filter(|a| a.client_id == client.id)
                    .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
                let feature = feature_service::find_by_key(&app_state.db, &feature_key)
                    .await?
                    .filter(|f| f.is_active && f.asset_kind == asset.kind)
                    .ok_or_else(|| AppError::NotFound("Feature not found".to_string()))?;
                let price = feature.price.as_deref().ok_or_else(|| {
                    AppError::Conflict("Feature has no purchase price.".to_string())
                })?;
                let amount = pricing_service::parse_price_minor(price).ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Feature {} has an unparseable price",
                        feature.id
                    ))
                })?;
                (
                    CheckoutMode::Payment,
                    amount,
                    feature.name.clone(),
                    feature_reference(client.id, asset.id, &feature.key),
                )
            }
            _ => {
                return Err(AppError::InvalidInput(
                    "Provide either plan_id or asset_id plus feature_key.".to_string(),
                ));
            }
        };

    let session = app_state
        .payments
        .create_checkout_session(&CheckoutParams {
            mode,
            amount_minor,
            currency: app_state.config.invoice_currency.clone(),
            product_name,
            client_reference: reference,
            customer_email: client.contact_email.clone(),
            success_url: format!("{}/billing/success", app_state.config.frontend_url),
            cancel_url: format!("{}/billing/cancelled", app_state.config.frontend_url),
        })
        .await?;

    Ok(success(serde_json::json!({ "url": session.url })))
}

async fn create_portal(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BILLING_PORTAL)?;

    let client_id = auth_user
        .client_id
        .ok_or_else(|| AppError::Forbidden("No client attached to this account".to_string()))?;
    let client = client_service::get_client(&app_state.db, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    let customer_id = client.processor_customer_id.as_deref().ok_or_else(|| {
        AppError::Conflict("Client has no billing history yet.".to_string())
    })?;

    let session = app_state
        .payments
        .create_portal_session(
            customer_id,
            &format!("{}/billing", app_state.config.frontend_url),
        )
        .await?;
    Ok(success(serde_json::json!({ "url": session.url })))
}

#[derive(Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Deserialize)]
struct WebhookObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    subscription: Option<String>,
}

/// Public endpoint authenticated by a shared secret header. Unknown event
/// types are acknowledged and dropped so the processor stops retrying them.
pub async fn handle_webhook(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, AppError> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != app_state.config.payments_webhook_secret {
        return Err(AppError::Unauthorized(
            "Invalid webhook secret".to_string(),
        ));
    }

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            handle_checkout_completed(&app_state, &event.data.object).await?;
        }
        "customer.subscription.deleted" => {
            let Some(subscription_id) = event.data.object.id.as_deref() else {
                return Err(AppError::InvalidInput(
                    "Subscription event without an id".to_string(),
                ));
            };
            match subscription_service::mark_canceled(&app_state.db, subscription_id).await? {
                Some(sub) => info!(
                    client_id = sub.client_id,
                    subscription_id, "subscription canceled"
                ),
                None => warn!(subscription_id, "cancel event for unknown subscription"),
            }
        }
        other => {
            info!(event_type = other, "ignoring unhandled webhook event");
        }
    }
    Ok(success(serde_json::json!({ "received": true })))
}

async fn handle_checkout_completed(
    app_state: &AppState,
    object: &WebhookObject,
) -> Result<(), AppError> {
    let Some(reference) = object.client_reference_id.as_deref() else {
        warn!("checkout completion without a client reference");
        return Ok(());
    };
    let Some(parsed) = parse_reference(reference) else {
        warn!(reference, "unparseable checkout reference");
        return Ok(());
    };

    match parsed {
        CheckoutRef::Plan { client_id, plan_id } => {
            let customer = object.customer.as_deref().filter(|c| !c.is_empty());
            let Some(client) =
                client_service::activate_plan(&app_state.db, client_id, plan_id, customer).await?
            else {
                warn!(client_id, "plan checkout for unknown client");
                return Ok(());
            };
            if let (Some(subscription_id), Some(customer)) =
                (object.subscription.as_deref(), customer)
            {
                subscription_service::upsert_subscription(
                    &app_state.db,
                    client.id,
                    Some(plan_id),
                    subscription_id,
                    customer,
                    SubscriptionStatus::Active,
                    None,
                )
                .await?;
            }
            info!(client_id = client.id, plan_id, "retainer plan activated");

            // The welcome email must never fail the webhook acknowledgement.
            if let Some(contact) = client.contact_email.as_deref() {
                if let Err(e) = app_state.notifier.welcome(&client.name, contact).await {
                    error!(error = %e, client_id = client.id, "welcome email failed");
                }
            }
        }
        CheckoutRef::Feature {
            client_id,
            asset_id,
            feature_key,
        } => {
            let Some(feature) =
                feature_service::find_by_key(&app_state.db, &feature_key).await?
            else {
                warn!(feature_key, "feature checkout for unknown feature");
                return Ok(());
            };
            entitlement_service::upsert_entitlement(
                &app_state.db,
                client_id,
                asset_id,
                feature.id,
                EntitlementStatus::Active,
            )
            .await?;
            info!(client_id, asset_id, feature_key, "purchased feature entitled");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_reference_round_trips() {
        let reference = plan_reference(7, 2);
        assert_eq!(reference, "client:7:plan:2");
        assert_eq!(
            parse_reference(&reference),
            Some(CheckoutRef::Plan {
                client_id: 7,
                plan_id: 2
            })
        );
    }

    #[test]
    fn feature_reference_round_trips() {
        let reference = feature_reference(7, 31, "tickets");
        assert_eq!(reference, "client:7:asset:31:feature:tickets");
        assert_eq!(
            parse_reference(&reference),
            Some(CheckoutRef::Feature {
                client_id: 7,
                asset_id: 31,
                feature_key: "tickets".to_string()
            })
        );
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert_eq!(parse_reference(""), None);
        assert_eq!(parse_reference("client:x:plan:2"), None);
        assert_eq!(parse_reference("client:7"), None);
        assert_eq!(parse_reference("client:7:asset:31:feature:"), None);
        assert_eq!(parse_reference("order:7:plan:2"), None);
    }
}
