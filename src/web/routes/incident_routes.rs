use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::entities::{client, incident};
use crate::db::enums::{IncidentSeverity, IncidentSource, IncidentStatus};
use crate::db::services::{client_service, incident_service};
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

const INBOUND_TOKEN_HEADER: &str = "X-Inbound-Token";

pub fn create_incident_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_incidents).post(create_incident))
        .route("/{id}", get(get_incident).put(update_incident))
}

#[derive(Deserialize)]
struct ListIncidentsQuery {
    client_id: Option<i32>,
    status: Option<IncidentStatus>,
}

async fn list_incidents(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::INCIDENTS_READ)?;

    let incidents =
        incident_service::list_incidents(&app_state.db, query.client_id, query.status).await?;
    Ok(success(incidents))
}

async fn get_incident(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::INCIDENTS_READ)?;

    let incident = incident_service::get_incident(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))?;
    Ok(success(incident))
}

#[derive(Deserialize)]
struct CreateIncidentRequest {
    client_id: i32,
    asset_id: Option<i32>,
    title: String,
    body: Option<String>,
    severity: IncidentSeverity,
}

async fn create_incident(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateIncidentRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::INCIDENTS_WRITE)?;

    if payload.title.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Incident title must not be empty.".to_string(),
        ));
    }
    let client = client_service::get_client(&app_state.db, payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let incident = incident_service::create_incident(
        &app_state.db,
        incident_service::NewIncident {
            client_id: payload.client_id,
            asset_id: payload.asset_id,
            title: payload.title,
            body: payload.body,
            severity: payload.severity,
            source: IncidentSource::Manual,
            reporter_email: None,
        },
    )
    .await?;

    notify_incident(&app_state, &incident, &client).await;
    Ok((StatusCode::CREATED, success(incident)))
}

#[derive(Deserialize)]
struct UpdateIncidentRequest {
    title: Option<String>,
    body: Option<String>,
    severity: Option<IncidentSeverity>,
    status: Option<IncidentStatus>,
    assignee_user_id: Option<i32>,
}

async fn update_incident(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateIncidentRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::INCIDENTS_WRITE)?;

    let updated = incident_service::update_incident(
        &app_state.db,
        id,
        incident_service::UpdateIncident {
            title: payload.title,
            body: payload.body,
            severity: payload.severity,
            status: payload.status,
            assignee_user_id: payload.assignee_user_id,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))?;
    Ok(success(updated))
}

#[derive(Deserialize)]
pub struct InboundEmailRequest {
    from_email: String,
    subject: String,
    body: Option<String>,
    client_slug: Option<String>,
}

/// Intake for the email-forwarding integration. Authenticated with a shared
/// token so the route can stay public. The sender is matched to a client by
/// explicit slug first, then by contact address.
pub async fn handle_inbound_email(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<InboundEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provided = headers
        .get(INBOUND_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != app_state.config.inbound_email_token {
        return Err(AppError::Unauthorized("Invalid intake token".to_string()));
    }
    if payload.subject.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Email subject must not be empty.".to_string(),
        ));
    }

    let client = match &payload.client_slug {
        Some(slug) => client_service::find_by_slug(&app_state.db, slug).await?,
        None => None,
    };
    let client = match client {
        Some(c) => Some(c),
        None => client_service::find_by_contact_email(&app_state.db, &payload.from_email).await?,
    };
    let Some(client) = client else {
        return Err(AppError::NotFound(
            "No client matches this sender".to_string(),
        ));
    };

    let incident = incident_service::create_incident(
        &app_state.db,
        incident_service::NewIncident {
            client_id: client.id,
            asset_id: None,
            title: payload.subject,
            body: payload.body,
            severity: IncidentSeverity::Medium,
            source: IncidentSource::Email,
            reporter_email: Some(payload.from_email),
        },
    )
    .await?;

    info!(
        incident_id = incident.id,
        client_id = client.id,
        "incident opened from inbound email"
    );
    notify_incident(&app_state, &incident, &client).await;
    Ok((StatusCode::CREATED, success(incident)))
}

/// Notification failures are logged, never surfaced; the incident row is
/// already committed.
async fn notify_incident(app_state: &AppState, incident: &incident::Model, client: &client::Model) {
    if let Err(e) = app_state
        .notifier
        .incident_created(incident, &client.name)
        .await
    {
        error!(error = %e, incident_id = incident.id, "incident notification failed");
    }
}
