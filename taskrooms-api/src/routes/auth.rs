/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new account
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{validation_failed, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Json};
use taskrooms_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub full_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user (password hash never serialized)
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn issue_tokens(state: &AppState, user_id: uuid::Uuid) -> ApiResult<(String, String)> {
    let access_claims = jwt::Claims::new(user_id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user_id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok((access_token, refresh_token))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "correct-horse-7",
///   "full_name": "Jane Doe"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or weak password
/// - `409 Conflict`: Email already in use
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate().map_err(validation_failed)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    // Duplicate email surfaces as a unique violation, mapped to 409
    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash: Some(password_hash),
            google_id: None,
            full_name: req.full_name,
        },
    )
    .await?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;

    Ok(Json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email, wrong password, or federated-only
///   account (all reported identically, so the response doesn't reveal
///   which emails exist)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate().map_err(validation_failed)?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    // Federated accounts have no password hash
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    if !password::verify_password(&req.password, hash)? {
        return Err(invalid());
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;

    Ok(Json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/refresh
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
