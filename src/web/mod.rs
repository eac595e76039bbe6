use axum::{
    Json, Router,
    extract::{Extension, State},
    http::Method,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::bridges::bot_platform::BotPlatformClient;
use crate::bridges::payments::PaymentsClient;
use crate::notifications::senders::email_api::EmailApiSender;
use crate::notifications::service::NotificationService;
use crate::server::config::ServerConfig;
use crate::services::auth_service;
use crate::web::{
    middleware::auth,
    models::{AuthenticatedUser, LoginRequest, RegisterRequest, UserResponse, success},
    routes::*,
};

pub mod authz;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub bot_platform: BotPlatformClient,
    pub payments: PaymentsClient,
    pub notifier: NotificationService,
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_response = auth_service::register_user(&app_state.db, payload).await?;
    Ok(Json(user_response))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.db, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    let mut response = Json(login_response).into_response();
    let cookie_value = auth_cookie
        .to_string()
        .parse()
        .map_err(|_| AppError::InternalServerError("Invalid cookie value".to_string()))?;
    response
        .headers_mut()
        .insert(axum::http::header::SET_COOKIE, cookie_value);
    Ok(response)
}

async fn me_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success(serde_json::json!({
        "id": auth_user.id,
        "username": auth_user.username,
        "role": auth_user.role,
        "client_id": auth_user.client_id,
        "capabilities": authz::role_capabilities(&auth_user.role),
    })))
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_router(db: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let bot_platform = BotPlatformClient::new(
        config.bot_platform_url.clone(),
        config.bot_platform_admin_key.clone(),
    );
    let payments = PaymentsClient::new(
        config.payments_api_url.clone(),
        config.payments_secret_key.clone(),
    );
    let sender = Arc::new(EmailApiSender::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
    ));
    let notifier = NotificationService::new(
        sender,
        config.email_from.clone(),
        config.admin_inbox.clone(),
    );

    let app_state = Arc::new(AppState {
        db,
        config,
        bot_platform,
        payments,
        notifier,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let protect = |router: Router<Arc<AppState>>| {
        router.route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth,
        ))
    };

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route(
            "/api/auth/me",
            get(me_handler).route_layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth::auth,
            )),
        )
        // Public surfaces: plan catalog, processor webhook, email intake.
        .route("/api/public/plans", get(plan_routes::list_public_plans))
        .route("/api/billing/webhook", post(billing_routes::handle_webhook))
        .route(
            "/api/incidents/inbound",
            post(incident_routes::handle_inbound_email),
        )
        .nest("/api/clients", protect(client_routes::create_client_router()))
        .nest("/api/assets", protect(asset_routes::create_asset_router()))
        .nest("/api/plans", protect(plan_routes::create_plan_router()))
        .nest("/api/features", protect(feature_routes::create_feature_router()))
        .nest(
            "/api/entitlements",
            protect(entitlement_routes::create_entitlement_router()),
        )
        .nest("/api/bot", protect(bot_routes::create_bot_router()))
        .nest("/api/billing", protect(billing_routes::create_billing_router()))
        .nest(
            "/api/incidents",
            protect(incident_routes::create_incident_router()),
        )
        .nest(
            "/api/invoices",
            protect(invoice_routes::create_invoice_router()),
        )
        .with_state(app_state)
        .layer(cors)
}
