use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::enums::InvoiceStatus;
use crate::db::services::invoice_service::{self, InvoiceTransition};
use crate::db::services::client_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

pub fn create_invoice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/{id}", get(get_invoice))
        .route("/{id}/issue", post(issue_invoice))
        .route("/{id}/pay", post(pay_invoice))
        .route("/{id}/void", post(void_invoice))
}

#[derive(Deserialize)]
struct ListInvoicesQuery {
    client_id: Option<i32>,
}

async fn list_invoices(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    let client_filter = match auth_user.client_id {
        Some(own) => Some(own),
        None => query.client_id,
    };
    let invoices = invoice_service::list_invoices(&app_state.db, client_filter).await?;
    Ok(success(invoices))
}

async fn get_invoice(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::CONTENT_READ)?;

    let (invoice, items) = invoice_service::get_invoice_with_items(&app_state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
    authz::require_client_scope(&auth_user, invoice.client_id)?;

    Ok(success(serde_json::json!({
        "invoice": invoice,
        "line_items": items,
    })))
}

#[derive(Deserialize)]
struct LineItemRequest {
    description: String,
    quantity: i32,
    unit_price_minor: i64,
}

#[derive(Deserialize)]
struct CreateInvoiceRequest {
    client_id: i32,
    items: Vec<LineItemRequest>,
}

async fn create_invoice(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::BILLING_MANAGE)?;

    if payload.items.is_empty() {
        return Err(AppError::InvalidInput(
            "An invoice needs at least one line item.".to_string(),
        ));
    }
    for item in &payload.items {
        if item.quantity <= 0 || item.unit_price_minor < 0 {
            return Err(AppError::InvalidInput(
                "Line items need a positive quantity and a non-negative price.".to_string(),
            ));
        }
    }
    client_service::get_client(&app_state.db, payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let items = payload
        .items
        .into_iter()
        .map(|i| invoice_service::NewLineItem {
            description: i.description,
            quantity: i.quantity,
            unit_price_minor: i.unit_price_minor,
        })
        .collect();
    let (invoice, line_items) = invoice_service::create_invoice(
        &app_state.db,
        payload.client_id,
        &app_state.config.invoice_currency,
        app_state.config.invoice_tax_rate_percent,
        items,
    )
    .await?;

    info!(invoice_id = invoice.id, number = %invoice.number, "draft invoice created");
    Ok((
        StatusCode::CREATED,
        success(serde_json::json!({
            "invoice": invoice,
            "line_items": line_items,
        })),
    ))
}

async fn transition(
    app_state: &AppState,
    auth_user: &AuthenticatedUser,
    id: i32,
    to: InvoiceStatus,
) -> Result<crate::db::entities::invoice::Model, AppError> {
    authz::require_capability(auth_user, authz::BILLING_MANAGE)?;

    match invoice_service::transition_invoice(&app_state.db, id, to).await? {
        InvoiceTransition::NotFound => Err(AppError::NotFound("Invoice not found".to_string())),
        InvoiceTransition::Invalid { from } => Err(AppError::Conflict(format!(
            "Cannot move a {from:?} invoice to {to:?}"
        ))),
        InvoiceTransition::Updated(invoice) => Ok(invoice),
    }
}

async fn issue_invoice(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = transition(&app_state, &auth_user, id, InvoiceStatus::Issued).await?;

    // Delivery failure never rolls back the issue; it is logged and the
    // invoice can be re-sent by hand.
    if let Ok(Some(client)) = client_service::get_client(&app_state.db, invoice.client_id).await {
        if let Some(contact) = client.contact_email.as_deref() {
            if let Err(e) = app_state.notifier.invoice_issued(&invoice, contact).await {
                error!(error = %e, invoice_id = invoice.id, "invoice email failed");
            }
        }
    }
    Ok(success(invoice))
}

async fn pay_invoice(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = transition(&app_state, &auth_user, id, InvoiceStatus::Paid).await?;
    Ok(success(invoice))
}

async fn void_invoice(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = transition(&app_state, &auth_user, id, InvoiceStatus::Void).await?;
    Ok(success(invoice))
}
