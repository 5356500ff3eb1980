/// Task endpoints
///
/// Tasks belong to the user who created them and optionally to a room.
/// Completing a task stamps `completed_at`, bumps the owner's completed
/// counter, and advances the daily streak; undoing a completion reverses
/// the counter and clears the stamp (the streak is left alone).
///
/// # Endpoints
///
/// - `GET    /api/tasks` - The caller's tasks, with filters and sorting
/// - `POST   /api/tasks` - Create a task (personal or in a room)
/// - `GET    /api/tasks/stats` - Status breakdown of the caller's tasks
/// - `GET    /api/tasks/room/:room_id` - Tasks in a room
/// - `GET    /api/tasks/:id` - Single task
/// - `PUT    /api/tasks/:id` - Update fields and status (creator or room member)
/// - `DELETE /api/tasks/:id` - Delete (creator or room owner)

use crate::{
    app::AppState,
    error::{validation_failed, ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use taskrooms_shared::{
    auth::{middleware::AuthUser, rules},
    models::{
        room::{Room, RoomMember},
        task::{
            CreateTask, RoomScope, SortOrder, Task, TaskFilter, TaskPriority, TaskSortBy,
            TaskStatus, UpdateTask,
        },
        user::User,
    },
    stats::{advance_streak, TaskStats},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Task creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub room_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Task update request
///
/// Omitted fields are left unchanged; nullable fields accept an explicit
/// `null` to clear the stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    pub tags: Option<Vec<String>>,
}

/// Task listing query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Absent = any, `"personal"` = no room, or a room UUID
    pub room_id: Option<String>,

    pub search: Option<String>,
    pub sort_by: Option<TaskSortBy>,
    pub sort_order: Option<SortOrder>,
}

/// Stats query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatsQuery {
    /// Absent = all tasks, `"personal"` = no room, or a room UUID
    pub room_id: Option<String>,
}

/// Filters for the room task listing
#[derive(Debug, Deserialize)]
pub struct RoomTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Loads a task or 404s
async fn load_task(state: &AppState, id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// List the caller's tasks
///
/// # Endpoint
///
/// ```text
/// GET /api/tasks?status=pending&priority=high&roomId=personal&search=report&sortBy=dueDate&sortOrder=asc
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `roomId` is neither `"personal"` nor a UUID
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let room = RoomScope::parse(query.room_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid roomId filter".to_string()))?;

    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        room,
        search: query.search,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
    };

    let tasks = Task::list_for_user(&state.db, auth.id, &filter).await?;

    Ok(Json(tasks))
}

/// Status breakdown of the caller's tasks
///
/// Counts the caller's tasks by status, plus how many are overdue. The
/// optional `roomId` parameter scopes the counts the same way the task
/// listing does.
///
/// # Errors
///
/// - `400 Bad Request`: `roomId` is neither `"personal"` nor a UUID
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TaskStatsQuery>,
) -> ApiResult<Json<TaskStats>> {
    let scope = RoomScope::parse(query.room_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid roomId filter".to_string()))?;

    let stats = Task::stats_for_user(&state.db, auth.id, scope).await?;

    Ok(Json(stats))
}

/// List tasks in a room, newest first (members only)
pub async fn list_room_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<RoomTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    Room::find_by_id(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;

    let my_role = RoomMember::role_of(&state.db, room_id, auth.id).await?;
    rules::room_view(my_role)?;

    let tasks = Task::list_by_room(
        &state.db,
        room_id,
        query.status,
        query.priority,
        query.search.as_deref(),
    )
    .await?;

    Ok(Json(tasks))
}

/// Create a task
///
/// A task with a `room_id` requires the caller to be a member of that
/// room. Creation bumps the owner's lifetime task counter.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Not a member of the target room
/// - `404 Not Found`: Target room doesn't exist
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(validation_failed)?;

    if let Some(room_id) = req.room_id {
        Room::find_by_id(&state.db, room_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;

        let role = RoomMember::role_of(&state.db, room_id, auth.id).await?;
        rules::room_create_task(role)?;
    }

    let task = Task::create(
        &state.db,
        auth.id,
        CreateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
            room_id: req.room_id,
            assigned_to: req.assigned_to,
            tags: req.tags,
        },
    )
    .await?;

    User::increment_total_tasks(&state.db, auth.id).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Get a single task
///
/// Visible to the creator, the assignee, and members of the task's room.
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state, id).await?;

    let room_role = match task.room_id {
        Some(room_id) => RoomMember::role_of(&state.db, room_id, auth.id).await?,
        None => None,
    };

    rules::task_view(
        task.user_id == auth.id,
        task.assigned_to == Some(auth.id),
        room_role,
    )?;

    Ok(Json(task))
}

/// Update a task (creator or any member of the task's room)
///
/// Moving into `completed` stamps `completed_at` with the current time,
/// increments the owner's completed counter, and advances the streak for
/// today. Moving out of `completed` clears the stamp and decrements the
/// counter; the streak is not rewound.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_failed)?;

    let task = load_task(&state, id).await?;

    let room_role = match task.room_id {
        Some(room_id) => RoomMember::role_of(&state.db, room_id, auth.id).await?,
        None => None,
    };
    rules::task_update(task.user_id == auth.id, room_role)?;

    let now = Utc::now();
    let mut completed_at: Option<Option<DateTime<Utc>>> = None;

    let becoming_completed = matches!(req.status, Some(TaskStatus::Completed))
        && task.status != TaskStatus::Completed;
    let leaving_completed = task.status == TaskStatus::Completed
        && matches!(req.status, Some(s) if s != TaskStatus::Completed);

    if becoming_completed {
        completed_at = Some(Some(now));
    } else if leaving_completed {
        completed_at = Some(None);
    }

    let updated = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assigned_to: req.assigned_to,
            tags: req.tags,
            completed_at,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if becoming_completed {
        let owner = User::find_by_id(&state.db, task.user_id)
            .await?
            .ok_or_else(|| ApiError::InternalError("Task owner missing".to_string()))?;

        let streak = advance_streak(owner.streak_state(), now.date_naive());
        User::apply_completion(&state.db, task.user_id, streak).await?;

        tracing::debug!(task_id = %id, user_id = %task.user_id, streak = streak.current_streak, "Task completed");
    } else if leaving_completed {
        User::decrement_completed_tasks(&state.db, task.user_id).await?;
    }

    Ok(Json(updated))
}

/// Delete a task (creator, or the owner of the task's room)
///
/// Adjusts the owner's counters: the lifetime total always drops by one,
/// and the completed count too when the task was completed.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let task = load_task(&state, id).await?;

    let room_role = match task.room_id {
        Some(room_id) => RoomMember::role_of(&state.db, room_id, auth.id).await?,
        None => None,
    };
    rules::task_delete(task.user_id == auth.id, room_role)?;

    let was_completed = task.status == TaskStatus::Completed;

    Task::delete(&state.db, id).await?;
    User::record_task_deleted(&state.db, task.user_id, was_completed).await?;

    Ok(Json(serde_json::json!({ "message": "Task deleted" })))
}
