use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::db::entities::user;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse};

/// Registers a user. The first user ever created becomes the admin; everyone
/// after that starts as a portal client account until an admin promotes them.
pub async fn register_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    if req.username.is_empty() || req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Username must not be empty and password needs at least 8 characters.".to_string(),
        ));
    }
    if let Some(email) = &req.email {
        if !email.contains('@') {
            return Err(AppError::InvalidInput("Invalid email format.".to_string()));
        }
    }

    let existing: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(db)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(format!("Username lookup failed: {e}")))?;

    if existing.is_some() {
        return Err(AppError::UserAlreadyExists(
            "Username is already taken.".to_string(),
        ));
    }

    let user_count = user::Entity::find()
        .count(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("User count failed: {e}")))?;
    let role = if user_count == 0 { "admin" } else { "client" };

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(format!("Password hashing failed: {e}")))?;

    let now = Utc::now();
    let new_user = user::ActiveModel {
        username: Set(req.username.clone()),
        email: Set(req.email.clone()),
        password_hash: Set(Some(password_hash)),
        role: Set(role.to_string()),
        client_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(db).await {
        Ok(user_model) => Ok(UserResponse {
            id: user_model.id,
            username: user_model.username,
            role: user_model.role,
            client_id: user_model.client_id,
        }),
        Err(e) => Err(AppError::DatabaseError(format!("User creation failed: {e}"))),
    }
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password must not be empty.".to_string(),
        ));
    }

    let user_model = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(db)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(format!("User lookup failed: {e}")))?;

    let user = match user_model {
        Some(u) => u,
        None => return Err(AppError::UserNotFound),
    };

    let password_hash = match user.password_hash.as_ref() {
        Some(hash) => hash,
        None => return Err(AppError::InvalidCredentials),
    };

    let valid_password = verify(&req.password, password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;

    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    // Token valid for 24 hours.
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        role: user.role.clone(),
        client_id: user.client_id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(format!("Token generation failed: {e}")))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        client_id: user.client_id,
    })
}
