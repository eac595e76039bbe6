use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::enums::AssetKind;
use crate::db::services::{asset_service, client_service, entitlement_service};
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

pub fn create_asset_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route(
            "/{id}",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
        .route("/{id}/config", get(get_asset_config))
}

#[derive(Deserialize)]
struct ListAssetsQuery {
    client_id: Option<i32>,
}

async fn list_assets(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListAssetsQuery>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    // Portal users are pinned to their own client regardless of the filter.
    let client_filter = match auth_user.client_id {
        Some(own) => Some(own),
        None => query.client_id,
    };
    let assets = asset_service::list_assets(&app_state.db, client_filter).await?;
    Ok(success(assets))
}

#[derive(Deserialize)]
struct CreateAssetRequest {
    client_id: i32,
    name: String,
    kind: AssetKind,
    external_ref: Option<String>,
}

async fn create_asset(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateAssetRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_WRITE)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Asset name must not be empty.".to_string(),
        ));
    }
    client_service::get_client(&app_state.db, payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let asset = asset_service::create_asset(
        &app_state.db,
        asset_service::NewAsset {
            client_id: payload.client_id,
            name: payload.name,
            kind: payload.kind,
            external_ref: payload.external_ref,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, success(asset)))
}

async fn get_asset(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    let asset = asset_service::get_asset(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    authz::require_client_scope(&auth_user, asset.client_id)?;
    Ok(success(asset))
}

#[derive(Deserialize)]
struct UpdateAssetRequest {
    name: Option<String>,
    external_ref: Option<String>,
}

async fn update_asset(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAssetRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_WRITE)?;

    let updated = asset_service::update_asset(
        &app_state.db,
        id,
        asset_service::UpdateAsset {
            name: payload.name,
            external_ref: payload.external_ref,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    Ok(success(updated))
}

async fn delete_asset(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    let rows = asset_service::delete_asset(&app_state.db, id).await?;
    if rows == 0 {
        return Err(AppError::NotFound("Asset not found".to_string()));
    }
    Ok(success(serde_json::json!({ "deleted": true })))
}

/// The resolved feature-flag map for an asset, the same shape the bot
/// platform consumes. An asset with no entitlements gets an empty map.
async fn get_asset_config(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BOT_FEATURES_READ)?;

    let asset = asset_service::get_asset(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    authz::require_client_scope(&auth_user, asset.client_id)?;

    let flags = entitlement_service::resolve_feature_flags(&app_state.db, asset.id).await?;
    Ok(success(flags))
}
