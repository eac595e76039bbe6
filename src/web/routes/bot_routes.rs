//! Bot platform workflow: tenant provisioning, per-guild feature toggles and
//! drift sync. Toggles are fail-closed, the remote call happens before any
//! local entitlement write so a platform outage never leaves a client billed
//! for a feature the bot is not running.

use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::entities::{asset, client};
use crate::db::enums::{AssetKind, EntitlementStatus};
use crate::db::services::{asset_service, client_service, entitlement_service, feature_service};
use crate::services::encryption_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

pub fn create_bot_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/provision", post(provision_tenant))
        .route("/assets/{id}/features/{key}/enable", post(enable_feature))
        .route("/assets/{id}/features/{key}/disable", post(disable_feature))
        .route("/assets/{id}/sync", post(sync_asset))
}

#[derive(Deserialize)]
struct ProvisionRequest {
    client_id: i32,
}

async fn provision_tenant(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BOT_PROVISION)?;

    let client = client_service::get_client(&app_state.db, payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    if client.bot_tenant_id.is_some() {
        return Err(AppError::Conflict(
            "Client already has a bot tenant.".to_string(),
        ));
    }

    let provisioned = app_state.bot_platform.provision_tenant(&client.slug).await?;

    let api_key_enc = encryption_service::encrypt(
        &provisioned.api_key,
        &app_state.config.secret_encryption_key,
    )
    .map_err(AppError::InternalServerError)?;
    client_service::set_bot_tenant(
        &app_state.db,
        client.id,
        &provisioned.tenant_id,
        &api_key_enc,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    // Register every bot asset that already carries a guild reference.
    let assets = asset_service::list_assets(&app_state.db, Some(client.id)).await?;
    let mut registered_guilds = 0;
    for a in assets.iter().filter(|a| a.kind == AssetKind::Bot) {
        if let Some(guild_id) = a.guild_id() {
            app_state
                .bot_platform
                .register_guild(&provisioned.api_key, &provisioned.tenant_id, guild_id)
                .await?;
            registered_guilds += 1;
        }
    }

    info!(
        client_id = client.id,
        tenant_id = %provisioned.tenant_id,
        registered_guilds,
        "bot tenant provisioned"
    );
    Ok(success(serde_json::json!({
        "tenant_id": provisioned.tenant_id,
        "registered_guilds": registered_guilds,
    })))
}

/// Asset, owning client, decrypted tenant API key and guild id, validated in
/// one place for the toggle and sync handlers.
struct TenantContext {
    asset: asset::Model,
    client: client::Model,
    api_key: String,
    tenant_id: String,
    guild_id: String,
}

async fn load_tenant_context(
    app_state: &AppState,
    auth_user: &AuthenticatedUser,
    asset_id: i32,
) -> Result<TenantContext, AppError> {
    let asset = asset_service::get_asset(&app_state.db, asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    authz::require_client_scope(auth_user, asset.client_id)?;

    if asset.kind != AssetKind::Bot {
        return Err(AppError::InvalidInput(
            "Feature toggles only apply to bot assets.".to_string(),
        ));
    }
    let guild_id = asset
        .guild_id()
        .ok_or_else(|| {
            AppError::Conflict("Asset has no guild reference configured.".to_string())
        })?
        .to_string();

    let client = client_service::get_client(&app_state.db, asset.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    let (Some(tenant_id), Some(api_key_enc)) =
        (client.bot_tenant_id.clone(), client.bot_api_key_enc.clone())
    else {
        return Err(AppError::Conflict(
            "Client has no bot tenant provisioned.".to_string(),
        ));
    };
    let api_key = encryption_service::decrypt(&api_key_enc, &app_state.config.secret_encryption_key)
        .map_err(AppError::InternalServerError)?;

    Ok(TenantContext {
        asset,
        client,
        api_key,
        tenant_id,
        guild_id,
    })
}

async fn enable_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path((asset_id, key)): Path<(i32, String)>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BOT_FEATURES_TOGGLE)?;

    let ctx = load_tenant_context(&app_state, &auth_user, asset_id).await?;
    let feature = feature_service::find_by_key(&app_state.db, &key)
        .await?
        .filter(|f| f.asset_kind == AssetKind::Bot)
        .ok_or_else(|| AppError::NotFound("Feature not found".to_string()))?;
    if !feature.is_active {
        return Err(AppError::Conflict(
            "Feature is no longer offered.".to_string(),
        ));
    }

    // Remote first. If the platform rejects the toggle nothing is persisted.
    app_state
        .bot_platform
        .enable_feature(&ctx.api_key, &ctx.tenant_id, &ctx.guild_id, &feature.config_key)
        .await?;

    let saved = entitlement_service::upsert_entitlement(
        &app_state.db,
        ctx.client.id,
        ctx.asset.id,
        feature.id,
        EntitlementStatus::Active,
    )
    .await?;

    info!(
        asset_id = ctx.asset.id,
        feature_key = %feature.key,
        "bot feature enabled"
    );
    Ok(success(saved))
}

async fn disable_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path((asset_id, key)): Path<(i32, String)>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BOT_FEATURES_TOGGLE)?;

    let ctx = load_tenant_context(&app_state, &auth_user, asset_id).await?;
    let feature = feature_service::find_by_key(&app_state.db, &key)
        .await?
        .filter(|f| f.asset_kind == AssetKind::Bot)
        .ok_or_else(|| AppError::NotFound("Feature not found".to_string()))?;

    app_state
        .bot_platform
        .disable_feature(&ctx.api_key, &ctx.tenant_id, &ctx.guild_id, &feature.config_key)
        .await?;

    // Revoking a never-enabled feature writes nothing and still succeeds.
    let revoked =
        entitlement_service::revoke_entitlement(&app_state.db, ctx.asset.id, feature.id).await?;

    info!(
        asset_id = ctx.asset.id,
        feature_key = %feature.key,
        "bot feature disabled"
    );
    Ok(success(revoked))
}

/// Reconciles local entitlements against the platform's enabled feature set.
/// The platform wins: locally-missing features are activated, locally-extra
/// ones revoked.
async fn sync_asset(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BOT_SYNC)?;

    let ctx = load_tenant_context(&app_state, &auth_user, asset_id).await?;
    let remote_keys = app_state
        .bot_platform
        .fetch_enabled_features(&ctx.api_key, &ctx.tenant_id, &ctx.guild_id)
        .await?;

    let local_flags =
        entitlement_service::resolve_feature_flags(&app_state.db, ctx.asset.id).await?;
    let local_keys: Vec<String> = local_flags.into_keys().collect();

    let plan = entitlement_service::plan_reconciliation(&local_keys, &remote_keys);

    for config_key in &plan.activated {
        let Some(feature) =
            feature_service::find_by_config_key(&app_state.db, config_key).await?
        else {
            info!(config_key, "remote feature has no local catalog entry; skipped");
            continue;
        };
        entitlement_service::upsert_entitlement(
            &app_state.db,
            ctx.client.id,
            ctx.asset.id,
            feature.id,
            EntitlementStatus::Active,
        )
        .await?;
    }
    for config_key in &plan.revoked {
        let Some(feature) =
            feature_service::find_by_config_key(&app_state.db, config_key).await?
        else {
            continue;
        };
        entitlement_service::revoke_entitlement(&app_state.db, ctx.asset.id, feature.id).await?;
    }

    info!(
        asset_id = ctx.asset.id,
        activated = plan.activated.len(),
        revoked = plan.revoked.len(),
        "entitlements reconciled against bot platform"
    );
    Ok(success(plan))
}
