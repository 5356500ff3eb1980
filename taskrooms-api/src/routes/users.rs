/// User profile, stats, and search endpoints
///
/// # Endpoints
///
/// - `GET /api/users/profile` - Current user's profile
/// - `PUT /api/users/profile` - Update profile (email, name, avatar)
/// - `PUT /api/users/password` - Change password
/// - `GET /api/users/stats` - Productivity stats (counters, breakdown, weekly series)
/// - `GET /api/users/search?q=` - Search users by name or email

use crate::{
    app::AppState,
    error::{validation_failed, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use taskrooms_shared::{
    auth::{middleware::AuthUser, password},
    models::{
        task::{RoomScope, Task},
        user::{UpdateProfile, User},
    },
    stats::TaskStats,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const SEARCH_RESULT_LIMIT: i64 = 10;

/// Profile update request
///
/// Omitted fields are left unchanged; `avatar_url: null` clears the avatar.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub full_name: Option<String>,

    /// Absent leaves the avatar unchanged; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

/// Distinguishes an absent field (outer None, via `default`) from an
/// explicit `null` (Some(None))
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password, verified before any change
    pub current_password: String,

    /// New password
    pub new_password: String,
}

/// Public view of a user, used in search results
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
        }
    }
}

/// One day of the weekly completion series
#[derive(Debug, Serialize)]
pub struct WeeklyCompletion {
    pub date: NaiveDate,
    pub count: i64,
}

/// Productivity stats response
#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    /// Lifetime task count
    pub total_tasks: i32,

    /// Currently-completed task count
    pub completed_tasks: i32,

    /// Consecutive-day completion streak
    pub current_streak: i32,

    /// Highest streak ever reached
    pub max_streak: i32,

    /// Live breakdown of the user's tasks by status
    pub tasks: TaskStats,

    /// Completions per day over the trailing week
    pub weekly_completions: Vec<WeeklyCompletion>,
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Get the current user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Update the current user's profile
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: New email already belongs to another account
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate().map_err(validation_failed)?;

    // Reject an email change before writing anything
    if let Some(ref email) = req.email {
        if User::email_taken_by_other(&state.db, email, auth.id).await? {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let user = User::update_profile(
        &state.db,
        auth.id,
        UpdateProfile {
            email: req.email,
            full_name: req.full_name,
            avatar_url: req.avatar_url,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Change the current user's password
///
/// # Errors
///
/// - `400 Bad Request`: New password too weak, or account has no password
///   (federated login)
/// - `401 Unauthorized`: Current password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let hash = user.password_hash.as_deref().ok_or_else(|| {
        ApiError::BadRequest("Password login is not enabled for this account".to_string())
    })?;

    if !password::verify_password(&req.current_password, hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e,
        }])
    })?;

    let new_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, auth.id, &new_hash).await?;

    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

/// Get the current user's productivity stats
///
/// Combines the stored counters (lifetime totals and streak) with a live
/// breakdown of the user's tasks and the trailing-week completion series.
pub async fn my_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserStatsResponse>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let tasks = Task::stats_for_user(&state.db, auth.id, RoomScope::Any).await?;

    let weekly_completions = Task::weekly_completions(&state.db, auth.id)
        .await?
        .into_iter()
        .map(|(date, count)| WeeklyCompletion { date, count })
        .collect();

    Ok(Json(UserStatsResponse {
        total_tasks: user.total_tasks,
        completed_tasks: user.completed_tasks,
        current_streak: user.current_streak,
        max_streak: user.max_streak,
        tasks,
        weekly_completions,
    }))
}

/// Search users by name or email
///
/// The query must be at least 2 characters; the searching user is never
/// included and results are capped at 10.
///
/// # Endpoint
///
/// ```text
/// GET /api/users/search?q=jane
/// ```
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let q = query.q.trim();
    if q.chars().count() < 2 {
        return Err(ApiError::BadRequest(
            "Search query must be at least 2 characters".to_string(),
        ));
    }

    let users = User::search(&state.db, q, auth.id, SEARCH_RESULT_LIMIT).await?;

    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}
