use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::plan_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

/// Public plan catalog for the marketing site.
pub async fn list_public_plans(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let plans = plan_service::list_plans(&app_state.db, true).await?;
    Ok(success(plans))
}

pub fn create_plan_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/{id}", get(get_plan).put(update_plan).delete(delete_plan))
}

async fn list_plans(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;
    let plans = plan_service::list_plans(&app_state.db, false).await?;
    Ok(success(plans))
}

async fn get_plan(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;
    let plan = plan_service::get_plan(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;
    Ok(success(plan))
}

#[derive(Deserialize)]
struct CreatePlanRequest {
    name: String,
    price: String,
    included_hours: i32,
    blurb: Option<String>,
    #[serde(default)]
    sort_order: i32,
}

async fn create_plan(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Plan name must not be empty.".to_string(),
        ));
    }
    let plan = plan_service::create_plan(
        &app_state.db,
        plan_service::NewPlan {
            name: payload.name,
            price: payload.price,
            included_hours: payload.included_hours,
            blurb: payload.blurb,
            sort_order: payload.sort_order,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, success(plan)))
}

#[derive(Deserialize)]
struct UpdatePlanRequest {
    name: Option<String>,
    price: Option<String>,
    included_hours: Option<i32>,
    blurb: Option<String>,
    sort_order: Option<i32>,
    is_active: Option<bool>,
}

async fn update_plan(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    let updated = plan_service::update_plan(
        &app_state.db,
        id,
        plan_service::UpdatePlan {
            name: payload.name,
            price: payload.price,
            included_hours: payload.included_hours,
            blurb: payload.blurb,
            sort_order: payload.sort_order,
            is_active: payload.is_active,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;
    Ok(success(updated))
}

async fn delete_plan(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    let rows = plan_service::delete_plan(&app_state.db, id).await?;
    if rows == 0 {
        return Err(AppError::NotFound("Plan not found".to_string()));
    }
    Ok(success(serde_json::json!({ "deleted": true })))
}
