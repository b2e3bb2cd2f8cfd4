use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AuthError, LoginRequest, PublicUser, RegisterRequest};
use crate::services::account::AccountService;

fn map_auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::EmailTaken => AppError::BadRequest("User already exists".to_string()),
        AuthError::InvalidCredentials => AppError::Auth("Invalid email or password".to_string()),
        AuthError::NotFound => AppError::NotFound("User not found".to_string()),
        AuthError::Validation(msg) => AppError::ValidationError(msg),
        AuthError::Database(msg) => AppError::Database(msg),
        AuthError::Hash(msg) | AuthError::Token(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state);

    let response = service.register(request).await.map_err(map_auth_error)?;

    Ok(Json(json!({
        "token": response.token,
        "user": response.user
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state);

    let response = service.login(request).await.map_err(map_auth_error)?;

    Ok(Json(json!({
        "token": response.token,
        "user": response.user
    })))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user identifier in token".to_string()))?;

    let service = AccountService::new(&state);
    let record = service.get_user(user_id).await.map_err(map_auth_error)?;

    Ok(Json(json!({ "user": PublicUser::from(&record) })))
}
