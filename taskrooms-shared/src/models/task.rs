/// Task model and database operations
///
/// Tasks belong to their creating user and optionally to a room. A task
/// with no room is "personal"; the personal/room distinction is a real
/// tri-state filter ([`RoomScope`]), not a sentinel value.
///
/// # Status transitions
///
/// ```text
/// pending ↔ in_progress ↔ completed
/// ```
///
/// Any status may move to any other; `completed_at` is stamped exactly when
/// a task enters `completed` and cleared when it leaves.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     user_id UUID NOT NULL REFERENCES users(id),
///     room_id UUID REFERENCES rooms(id),
///     assigned_to UUID REFERENCES users(id),
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::stats::TaskStats;

use super::escape_like;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    Pending,

    /// Being worked on
    InProgress,

    /// Done; `completed_at` is set
    Completed,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl TaskPriority {
    /// Converts priority to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

/// Tri-state room filter for task listings
///
/// Replaces the overloaded optional-with-sentinel a client sends as the
/// `roomId` query parameter: absent means any room, `"personal"` means
/// tasks with no room, and a UUID means tasks in that room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomScope {
    /// No room constraint
    #[default]
    Any,

    /// Personal tasks only (no room)
    Personal,

    /// Tasks in one specific room
    Room(Uuid),
}

impl RoomScope {
    /// Parses the `roomId` query parameter
    ///
    /// Returns None for values that are neither `"personal"` nor a UUID.
    pub fn parse(param: Option<&str>) -> Option<Self> {
        match param {
            None | Some("") => Some(RoomScope::Any),
            Some("personal") => Some(RoomScope::Personal),
            Some(raw) => raw.parse::<Uuid>().ok().map(RoomScope::Room),
        }
    }
}

/// Sort keys accepted for task listings
///
/// A closed enum so the ORDER BY clause is always built from a whitelist,
/// never from caller-supplied text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortBy {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Title,
}

impl TaskSortBy {
    /// Column expression for the ORDER BY clause
    fn column(&self) -> &'static str {
        match self {
            TaskSortBy::CreatedAt => "created_at",
            TaskSortBy::DueDate => "due_date",
            TaskSortBy::Priority => "priority",
            TaskSortBy::Title => "title",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters for task listings
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Restrict to one status
    pub status: Option<TaskStatus>,

    /// Restrict to one priority
    pub priority: Option<TaskPriority>,

    /// Room scope (any / personal / specific room)
    pub room: RoomScope,

    /// Case-insensitive substring over title and description
    pub search: Option<String>,

    /// Sort key (default: creation time)
    pub sort_by: TaskSortBy,

    /// Sort direction (default: newest first)
    pub sort_order: SortOrder,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Priority (defaults to medium)
    pub priority: TaskPriority,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Creating user; immutable
    pub user_id: Uuid,

    /// Room the task belongs to; None means personal
    pub room_id: Option<Uuid>,

    /// Optional assignee
    pub assigned_to: Option<Uuid>,

    /// Free-form tags
    pub tags: Vec<String>,

    /// Set exactly while status is `completed`
    pub completed_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Priority; None falls back to the `medium` default
    pub priority: Option<TaskPriority>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Room the task belongs to (membership checked by the caller)
    pub room_id: Option<Uuid>,

    /// Optional assignee
    pub assigned_to: Option<Uuid>,

    /// Tags
    pub tags: Vec<String>,
}

/// Input for updating a task
///
/// Only non-None fields are written. Status transitions and their side
/// effects (completed_at stamping, counters, streak) are orchestrated by
/// the caller, which also binds `completed_at` here.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, user_id, \
     room_id, assigned_to, tags, completed_at, created_at, updated_at";

impl Task {
    /// Creates a task
    ///
    /// Status starts as `pending`; priority defaults to `medium` when not
    /// given. The creator's `total_tasks` counter is incremented by the
    /// caller after a successful insert.
    pub async fn create(pool: &PgPool, user_id: Uuid, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, priority, due_date, user_id, room_id, assigned_to, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority.unwrap_or_default())
        .bind(data.due_date)
        .bind(user_id)
        .bind(data.room_id)
        .bind(data.assigned_to)
        .bind(data.tags)
        .fetch_one(pool)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's tasks with filters
    ///
    /// Matches tasks the user created. Room scope, status, priority, and
    /// the case-insensitive search all stack; sort key and direction come
    /// from the whitelisted enums.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1");
        let mut bind_count = 1;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${bind_count}"));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${bind_count}"));
        }
        match filter.room {
            RoomScope::Any => {}
            RoomScope::Personal => query.push_str(" AND room_id IS NULL"),
            RoomScope::Room(_) => {
                bind_count += 1;
                query.push_str(&format!(" AND room_id = ${bind_count}"));
            }
        }
        if filter.search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${bind_count} OR description ILIKE ${bind_count})"
            ));
        }

        query.push_str(&format!(
            " ORDER BY {} {}",
            filter.sort_by.column(),
            filter.sort_order.keyword(),
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let RoomScope::Room(room_id) = filter.room {
            q = q.bind(room_id);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }

        q.fetch_all(pool).await
    }

    /// Lists all tasks in a room, newest first
    ///
    /// Optional status/priority/search filters; membership is checked by
    /// the caller.
    pub async fn list_by_room(
        pool: &PgPool,
        room_id: Uuid,
        status: Option<TaskStatus>,
        priority: Option<TaskPriority>,
        search: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE room_id = $1");
        let mut bind_count = 1;

        if status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${bind_count}"));
        }
        if priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${bind_count}"));
        }
        if search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${bind_count} OR description ILIKE ${bind_count})"
            ));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(room_id);

        if let Some(status) = status {
            q = q.bind(status);
        }
        if let Some(priority) = priority {
            q = q.bind(priority);
        }
        if let Some(search) = search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }

        q.fetch_all(pool).await
    }

    /// Updates task fields
    ///
    /// Returns the updated task, or None if the task doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${bind_count}"));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${bind_count}"));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${bind_count}"));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${bind_count}"));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${bind_count}"));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${bind_count}"));
        }
        if data.tags.is_some() {
            bind_count += 1;
            query.push_str(&format!(", tags = ${bind_count}"));
        }
        if data.completed_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed_at = ${bind_count}"));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(completed_at) = data.completed_at {
            q = q.bind(completed_at);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task
    ///
    /// Returns true if the task existed. Counter adjustments on the owner
    /// are the caller's responsibility.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Aggregate counts for a user's tasks within a room scope
    ///
    /// `overdue` (due strictly before now and not completed) is only
    /// computed for non-room scopes, matching the personal stats view.
    pub async fn stats_for_user(
        pool: &PgPool,
        user_id: Uuid,
        room: RoomScope,
    ) -> Result<TaskStats, sqlx::Error> {
        let mut query = String::from(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE due_date < NOW() AND status <> 'completed') AS overdue
            FROM tasks
            WHERE user_id = $1
            "#,
        );

        match room {
            RoomScope::Any => {}
            RoomScope::Personal => query.push_str(" AND room_id IS NULL"),
            RoomScope::Room(_) => query.push_str(" AND room_id = $2"),
        }

        let mut q = sqlx::query_as::<_, TaskStats>(&query).bind(user_id);
        if let RoomScope::Room(room_id) = room {
            q = q.bind(room_id);
        }

        q.fetch_one(pool).await
    }

    /// Aggregate counts for every task in a room (no overdue column)
    pub async fn stats_for_room(pool: &PgPool, room_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        sqlx::query_as::<_, TaskStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed
            FROM tasks
            WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_one(pool)
        .await
    }

    /// Completions per day for the trailing week, oldest first
    pub async fn weekly_completions(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<(NaiveDate, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT completed_at::date AS day, COUNT(*) AS count
            FROM tasks
            WHERE user_id = $1
              AND completed_at >= NOW() - INTERVAL '7 days'
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_priority_strings() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");

        assert_eq!(TaskPriority::Low.as_str(), "low");
        assert_eq!(TaskPriority::Urgent.as_str(), "urgent");
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_room_scope_parse() {
        assert_eq!(RoomScope::parse(None), Some(RoomScope::Any));
        assert_eq!(RoomScope::parse(Some("")), Some(RoomScope::Any));
        assert_eq!(RoomScope::parse(Some("personal")), Some(RoomScope::Personal));

        let id = Uuid::new_v4();
        assert_eq!(
            RoomScope::parse(Some(&id.to_string())),
            Some(RoomScope::Room(id))
        );

        assert_eq!(RoomScope::parse(Some("not-a-uuid")), None);
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(TaskSortBy::CreatedAt.column(), "created_at");
        assert_eq!(TaskSortBy::DueDate.column(), "due_date");
        assert_eq!(TaskSortBy::Priority.column(), "priority");
        assert_eq!(TaskSortBy::Title.column(), "title");

        assert_eq!(SortOrder::Asc.keyword(), "ASC");
        assert_eq!(SortOrder::Desc.keyword(), "DESC");
    }

    #[test]
    fn test_default_filter_is_newest_first() {
        let filter = TaskFilter::default();
        assert_eq!(filter.sort_by, TaskSortBy::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Desc);
        assert_eq!(filter.room, RoomScope::Any);
        assert!(filter.status.is_none());
    }

    // Integration tests for database operations require a running Postgres
}
