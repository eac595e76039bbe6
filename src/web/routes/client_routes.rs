use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::{client_service, rhythm_service};
use crate::db::enums::ClientStatus;
use crate::web::models::success;
use crate::web::{AppError, AppState, authz};
use crate::web::models::AuthenticatedUser;

pub fn create_client_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/{id}/rhythms", get(list_rhythms))
        .route("/{id}/rhythms/{month}", put(upsert_rhythm))
}

async fn list_clients(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    // Portal users only ever see their own client record.
    if let Some(own_id) = auth_user.client_id {
        let client = client_service::get_client(&app_state.db, own_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
        return Ok(success(vec![client]));
    }
    if auth_user.role == "client" {
        return Ok(success(serde_json::json!([])));
    }

    let clients = client_service::list_clients(&app_state.db).await?;
    Ok(success(clients))
}

#[derive(Deserialize)]
struct CreateClientRequest {
    name: String,
    slug: String,
    contact_email: Option<String>,
    plan_id: Option<i32>,
}

async fn create_client(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_WRITE)?;

    if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Client name and slug must not be empty.".to_string(),
        ));
    }
    if client_service::find_by_slug(&app_state.db, &payload.slug)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Slug is already in use.".to_string()));
    }

    let client = client_service::create_client(
        &app_state.db,
        client_service::NewClient {
            name: payload.name,
            slug: payload.slug,
            contact_email: payload.contact_email,
            plan_id: payload.plan_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, success(client)))
}

async fn get_client(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;
    authz::require_client_scope(&auth_user, id)?;

    let client = client_service::get_client(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(success(client))
}

#[derive(Deserialize)]
struct UpdateClientRequest {
    name: Option<String>,
    contact_email: Option<String>,
    status: Option<ClientStatus>,
    plan_id: Option<i32>,
}

async fn update_client(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_WRITE)?;

    let updated = client_service::update_client(
        &app_state.db,
        id,
        client_service::UpdateClient {
            name: payload.name,
            contact_email: payload.contact_email,
            status: payload.status,
            plan_id: payload.plan_id,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(success(updated))
}

async fn delete_client(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_WRITE)?;

    let rows = client_service::delete_client(&app_state.db, id).await?;
    if rows == 0 {
        return Err(AppError::NotFound("Client not found".to_string()));
    }
    Ok(success(serde_json::json!({ "deleted": true })))
}

async fn list_rhythms(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;
    authz::require_client_scope(&auth_user, id)?;

    let rhythms = rhythm_service::list_for_client(&app_state.db, id).await?;
    Ok(success(rhythms))
}

#[derive(Deserialize)]
struct UpsertRhythmRequest {
    hours_used: f64,
    hours_included: f64,
    #[serde(default)]
    weekly_notes: Vec<String>,
}

async fn upsert_rhythm(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path((id, month)): Path<(i32, String)>,
    Json(payload): Json<UpsertRhythmRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_WRITE)?;

    if !rhythm_service::is_valid_month(&month) {
        return Err(AppError::InvalidInput(
            "Month must be formatted as YYYY-MM.".to_string(),
        ));
    }
    if payload.hours_used < 0.0 || payload.hours_included < 0.0 {
        return Err(AppError::InvalidInput(
            "Hours must not be negative.".to_string(),
        ));
    }
    client_service::get_client(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let rhythm = rhythm_service::upsert_rhythm(
        &app_state.db,
        id,
        &month,
        payload.hours_used,
        payload.hours_included,
        serde_json::json!(payload.weekly_notes),
    )
    .await?;
    Ok(success(rhythm))
}
