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
use crate::db::services::feature_service;
use crate::services::pricing_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

pub fn create_feature_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_features).post(create_feature))
        .route(
            "/{id}",
            get(get_feature).put(update_feature).delete(delete_feature),
        )
}

#[derive(Deserialize)]
struct ListFeaturesQuery {
    asset_kind: Option<AssetKind>,
}

async fn list_features(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListFeaturesQuery>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    // The catalog shown to clients only carries purchasable features.
    let only_active = auth_user.role == "client";
    let features =
        feature_service::list_features(&app_state.db, query.asset_kind, only_active).await?;
    Ok(success(features))
}

async fn get_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;
    let feature = feature_service::get_feature(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Feature not found".to_string()))?;
    Ok(success(feature))
}

#[derive(Deserialize)]
struct CreateFeatureRequest {
    key: String,
    config_key: String,
    name: String,
    description: Option<String>,
    asset_kind: AssetKind,
    price: Option<String>,
}

async fn create_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateFeatureRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    if payload.key.trim().is_empty() || payload.config_key.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Feature key and config_key must not be empty.".to_string(),
        ));
    }
    if let Some(price) = &payload.price {
        if pricing_service::parse_price_minor(price).is_none() {
            return Err(AppError::InvalidInput(format!(
                "Unparseable price: {price}"
            )));
        }
    }
    if feature_service::find_by_key(&app_state.db, &payload.key)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Feature key is already in use.".to_string(),
        ));
    }

    let feature = feature_service::create_feature(
        &app_state.db,
        feature_service::NewFeature {
            key: payload.key,
            config_key: payload.config_key,
            name: payload.name,
            description: payload.description,
            asset_kind: payload.asset_kind,
            price: payload.price,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, success(feature)))
}

#[derive(Deserialize)]
struct UpdateFeatureRequest {
    config_key: Option<String>,
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    is_active: Option<bool>,
}

async fn update_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateFeatureRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    if let Some(price) = &payload.price {
        if pricing_service::parse_price_minor(price).is_none() {
            return Err(AppError::InvalidInput(format!(
                "Unparseable price: {price}"
            )));
        }
    }
    let updated = feature_service::update_feature(
        &app_state.db,
        id,
        feature_service::UpdateFeature {
            config_key: payload.config_key,
            name: payload.name,
            description: payload.description,
            price: payload.price,
            is_active: payload.is_active,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Feature not found".to_string()))?;
    Ok(success(updated))
}

async fn delete_feature(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    let rows = feature_service::delete_feature(&app_state.db, id).await?;
    if rows == 0 {
        return Err(AppError::NotFound("Feature not found".to_string()));
    }
    Ok(success(serde_json::json!({ "deleted": true })))
}
