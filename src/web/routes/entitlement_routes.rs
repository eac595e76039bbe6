use axum::{
    Router,
    extract::{Extension, Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::entitlement_service;
use crate::web::models::{AuthenticatedUser, success};
use crate::web::{AppError, AppState, authz};

pub fn create_entitlement_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_entitlements))
}

#[derive(Deserialize)]
struct ListEntitlementsQuery {
    client_id: Option<i32>,
    asset_id: Option<i32>,
}

/// Raw entitlement rows for the admin console. Toggles go through the bot
/// routes, never through here.
async fn list_entitlements(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListEntitlementsQuery>,
) -> Result<impl IntoResponse, AppError> {
    authz::require_capability(&auth_user, authz::SYSTEM_READ)?;

    let rows =
        entitlement_service::list_entitlements(&app_state.db, query.client_id, query.asset_id)
            .await?;
    Ok(success(rows))
}
