/// User model and database operations
///
/// Users own tasks and rooms and carry cumulative productivity counters
/// (`total_tasks`, `completed_tasks`) plus streak storage. Counters are
/// always adjusted with atomic `SET x = x + 1` style updates so concurrent
/// task mutations for the same user never lose increments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255),          -- NULL for federated accounts
///     google_id VARCHAR(255) UNIQUE,
///     full_name VARCHAR(255) NOT NULL,
///     avatar_url VARCHAR(512),
///     total_tasks INTEGER NOT NULL DEFAULT 0,
///     completed_tasks INTEGER NOT NULL DEFAULT 0,
///     current_streak INTEGER NOT NULL DEFAULT 0,
///     max_streak INTEGER NOT NULL DEFAULT 0,
///     last_task_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::stats::StreakState;

use super::escape_like;

/// User model representing an account
///
/// Either `password_hash` or `google_id` is always present; federated
/// accounts have no password hash and cannot use credential login.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id password hash; None for federated-login accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// External-provider identifier for federated login
    pub google_id: Option<String>,

    /// Display name
    pub full_name: String,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Lifetime count of tasks created (decremented on task delete)
    pub total_tasks: i32,

    /// Lifetime count of tasks currently completed
    pub completed_tasks: i32,

    /// Consecutive-day completion streak
    pub current_streak: i32,

    /// Highest streak ever reached
    pub max_streak: i32,

    /// Calendar day of the most recent completion
    pub last_task_date: Option<NaiveDate>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the current streak counters for the streak engine
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current_streak: self.current_streak,
            max_streak: self.max_streak,
            last_task_date: self.last_task_date,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address (stored case-insensitively)
    pub email: String,

    /// Argon2id password hash; None for federated accounts
    pub password_hash: Option<String>,

    /// External-provider identifier, if registering via federated login
    pub google_id: Option<String>,

    /// Display name
    pub full_name: String,
}

/// Input for updating a user's profile
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    /// New email address
    pub email: Option<String>,

    /// New display name
    pub full_name: Option<String>,

    /// New avatar URL (Some(None) clears it)
    pub avatar_url: Option<Option<String>>,
}

const USER_COLUMNS: &str = "id, email, password_hash, google_id, full_name, avatar_url, \
     total_tasks, completed_tasks, current_streak, max_streak, last_task_date, \
     created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the email is already in
    /// use (surfaced to clients as a conflict).
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, google_id, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.google_id)
        .bind(data.full_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Checks whether another user already holds this email
    ///
    /// Used by profile updates so an email change can be rejected as a
    /// conflict before any write happens.
    pub async fn email_taken_by_other(
        pool: &PgPool,
        email: &str,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
        )
        .bind(email)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Updates profile fields
    ///
    /// Only non-None fields are written; `updated_at` is always refreshed.
    /// Returns the updated user, or None if the user doesn't exist.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${bind_count}"));
        }
        if data.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${bind_count}"));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${bind_count}"));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(avatar_url) = data.avatar_url {
            q = q.bind(avatar_url);
        }

        q.fetch_optional(pool).await
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically increments `total_tasks` (task created)
    pub async fn increment_total_tasks(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET total_tasks = total_tasks + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Atomically adjusts counters when a task is deleted
    ///
    /// `was_completed` also decrements `completed_tasks`. Counters are
    /// clamped at zero.
    pub async fn record_task_deleted(
        pool: &PgPool,
        id: Uuid,
        was_completed: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET total_tasks = GREATEST(total_tasks - 1, 0),
                completed_tasks = CASE WHEN $2
                    THEN GREATEST(completed_tasks - 1, 0)
                    ELSE completed_tasks END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(was_completed)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Atomically decrements `completed_tasks` (completion undone)
    pub async fn decrement_completed_tasks(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET completed_tasks = GREATEST(completed_tasks - 1, 0) WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Applies a task-completion event: counter increment plus streak write
    ///
    /// The `completed_tasks` increment stays atomic in SQL; the streak
    /// fields are the values computed by the streak engine for this event.
    pub async fn apply_completion(
        pool: &PgPool,
        id: Uuid,
        streak: StreakState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET completed_tasks = completed_tasks + 1,
                current_streak = $2,
                max_streak = $3,
                last_task_date = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(streak.current_streak)
        .bind(streak.max_streak)
        .bind(streak.last_task_date)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Searches users by name or email substring (case-insensitive)
    ///
    /// Excludes the searching user; capped at `limit` results.
    pub async fn search(
        pool: &PgPool,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(query));

        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE (full_name ILIKE $1 OR email::text ILIKE $1) AND id <> $2
            ORDER BY full_name ASC
            LIMIT $3
            "#,
        ))
        .bind(pattern)
        .bind(exclude)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_state_roundtrip() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            password_hash: Some("$argon2id$...".to_string()),
            google_id: None,
            full_name: "A".to_string(),
            avatar_url: None,
            total_tasks: 3,
            completed_tasks: 2,
            current_streak: 2,
            max_streak: 4,
            last_task_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let state = user.streak_state();
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.max_streak, 4);
        assert_eq!(state.last_task_date, user.last_task_date);
    }

    #[test]
    fn test_update_profile_default_is_empty() {
        let update = UpdateProfile::default();
        assert!(update.email.is_none());
        assert!(update.full_name.is_none());
        assert!(update.avatar_url.is_none());
    }

    // Integration tests for database operations require a running Postgres
}
