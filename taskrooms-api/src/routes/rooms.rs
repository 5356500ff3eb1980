/// Room endpoints
///
/// Rooms are invite-coded collaboration spaces with a single owner and a
/// role hierarchy (owner > admin > member). Joining is by invite code only;
/// leaving is open to everyone except the owner.
///
/// # Endpoints
///
/// - `GET    /api/rooms` - Rooms the caller belongs to
/// - `POST   /api/rooms` - Create a room (caller becomes owner)
/// - `POST   /api/rooms/join` - Join by invite code
/// - `GET    /api/rooms/:id` - Room details with member count (members only)
/// - `PUT    /api/rooms/:id` - Update settings (admin+)
/// - `DELETE /api/rooms/:id` - Delete room and its tasks (owner only)
/// - `POST   /api/rooms/:id/leave` - Leave the room
/// - `GET    /api/rooms/:id/members` - Member roster
/// - `GET    /api/rooms/:id/stats` - Task breakdown and member count

use crate::{
    app::AppState,
    error::{validation_failed, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use taskrooms_shared::{
    auth::{middleware::AuthUser, rules},
    models::{
        room::{CreateRoom, MemberRole, Room, RoomMember, UpdateRoom, INVITE_CODE_LEN},
        task::Task,
    },
    stats::TaskStats,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Room creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Room name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: bool,
}

/// Room update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Room name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    /// Absent leaves the description unchanged; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub is_public: Option<bool>,
    pub allow_member_invite: Option<bool>,
    pub auto_assign_tasks: Option<bool>,
}

/// Join-by-invite-code request
#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub invite_code: String,
}

/// Room details with the caller's role and the member count
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    #[serde(flatten)]
    pub room: Room,

    /// The caller's role, None when viewing a public room as a non-member
    pub my_role: Option<MemberRole>,

    pub member_count: i64,
}

/// Roster entry with the member's public profile
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MemberInfo {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Room stats response
#[derive(Debug, Serialize)]
pub struct RoomStatsResponse {
    pub tasks: TaskStats,
    pub member_count: i64,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Loads a room or 404s
async fn load_room(state: &AppState, id: Uuid) -> ApiResult<Room> {
    Room::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))
}

/// List rooms the caller is a member of
pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Room>>> {
    let rooms = Room::list_for_user(&state.db, auth.id).await?;
    Ok(Json(rooms))
}

/// Create a room
///
/// The caller becomes the owner and is added to the roster atomically with
/// the room itself.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<Room>)> {
    req.validate().map_err(validation_failed)?;

    let room = Room::create(
        &state.db,
        auth.id,
        CreateRoom {
            name: req.name,
            description: req.description,
            is_public: req.is_public,
        },
    )
    .await?;

    tracing::info!(room_id = %room.id, owner_id = %auth.id, "Room created");

    Ok((StatusCode::CREATED, Json(room)))
}

/// Join a room by invite code
///
/// Codes are matched case-insensitively.
///
/// # Errors
///
/// - `400 Bad Request`: Code is not 6 characters
/// - `404 Not Found`: No room has this code
/// - `409 Conflict`: Already a member
pub async fn join_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<JoinRoomRequest>,
) -> ApiResult<Json<RoomResponse>> {
    let code = req.invite_code.trim();
    if code.chars().count() != INVITE_CODE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Invite code must be {} characters",
            INVITE_CODE_LEN
        )));
    }

    let room = Room::find_by_invite_code(&state.db, code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid invite code".to_string()))?;

    if RoomMember::is_member(&state.db, room.id, auth.id).await? {
        return Err(ApiError::Conflict(
            "Already a member of this room".to_string(),
        ));
    }

    RoomMember::add(&state.db, room.id, auth.id, MemberRole::Member).await?;

    tracing::info!(room_id = %room.id, user_id = %auth.id, "User joined room");

    let member_count = RoomMember::count_by_room(&state.db, room.id).await?;

    Ok(Json(RoomResponse {
        room,
        my_role: Some(MemberRole::Member),
        member_count,
    }))
}

/// Get room details (members only)
pub async fn get_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RoomResponse>> {
    let room = load_room(&state, id).await?;

    let my_role = RoomMember::role_of(&state.db, id, auth.id).await?;
    rules::room_view(my_role)?;

    let member_count = RoomMember::count_by_room(&state.db, id).await?;

    Ok(Json(RoomResponse {
        room,
        my_role,
        member_count,
    }))
}

/// Update room settings (admin or owner)
pub async fn update_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoomRequest>,
) -> ApiResult<Json<Room>> {
    req.validate().map_err(validation_failed)?;

    load_room(&state, id).await?;

    let my_role = RoomMember::role_of(&state.db, id, auth.id).await?;
    rules::room_update(my_role)?;

    let room = Room::update(
        &state.db,
        id,
        UpdateRoom {
            name: req.name,
            description: req.description,
            is_public: req.is_public,
            allow_member_invite: req.allow_member_invite,
            auto_assign_tasks: req.auto_assign_tasks,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;

    Ok(Json(room))
}

/// Delete a room and every task in it (owner only)
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    load_room(&state, id).await?;

    let my_role = RoomMember::role_of(&state.db, id, auth.id).await?;
    rules::room_delete(my_role)?;

    Room::delete_cascade(&state.db, id).await?;

    tracing::info!(room_id = %id, user_id = %auth.id, "Room deleted");

    Ok(Json(serde_json::json!({ "message": "Room deleted" })))
}

/// Leave a room
///
/// # Errors
///
/// - `400 Bad Request`: Caller is not a member, or is the owner (the owner
///   deletes the room instead of leaving it)
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    load_room(&state, id).await?;

    match RoomMember::role_of(&state.db, id, auth.id).await? {
        None => {
            return Err(ApiError::BadRequest(
                "Not a member of this room".to_string(),
            ))
        }
        Some(MemberRole::Owner) => {
            return Err(ApiError::BadRequest(
                "The owner cannot leave the room".to_string(),
            ))
        }
        Some(_) => {}
    }

    RoomMember::remove(&state.db, id, auth.id).await?;

    tracing::info!(room_id = %id, user_id = %auth.id, "User left room");

    Ok(Json(serde_json::json!({ "message": "Left room" })))
}

/// List the room's member roster (members only)
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberInfo>>> {
    load_room(&state, id).await?;

    let my_role = RoomMember::role_of(&state.db, id, auth.id).await?;
    rules::room_view(my_role)?;

    let members = sqlx::query_as::<_, MemberInfo>(
        r#"
        SELECT m.user_id, u.full_name, u.email::text AS email, u.avatar_url, m.role, m.joined_at
        FROM room_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.room_id = $1
        ORDER BY m.joined_at ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(members))
}

/// Room stats: task breakdown by status plus member count (members only)
pub async fn room_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RoomStatsResponse>> {
    load_room(&state, id).await?;

    let my_role = RoomMember::role_of(&state.db, id, auth.id).await?;
    rules::room_view(my_role)?;

    let tasks = Task::stats_for_room(&state.db, id).await?;
    let member_count = RoomMember::count_by_room(&state.db, id).await?;

    Ok(Json(RoomStatsResponse {
        tasks,
        member_count,
    }))
}
