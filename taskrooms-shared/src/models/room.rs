/// Room model, membership roster, and invite codes
///
/// Rooms are invite-coded collaboration spaces. Every room has exactly one
/// owner, who is always present in `room_members` with role `owner` and can
/// never leave through the leave operation. Invite codes are six uppercase
/// alphanumerics, globally unique, generated at creation with a bounded
/// collision-retry loop.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_role AS ENUM ('owner', 'admin', 'member');
///
/// CREATE TABLE rooms (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     invite_code CHAR(6) NOT NULL UNIQUE,
///     is_public BOOLEAN NOT NULL DEFAULT FALSE,
///     allow_member_invite BOOLEAN NOT NULL DEFAULT TRUE,
///     auto_assign_tasks BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE room_members (
///     room_id UUID NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role member_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (room_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Length of room invite codes
pub const INVITE_CODE_LEN: usize = 6;

/// Alphabet for invite codes (uppercase alphanumerics)
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts before giving up on invite-code collisions
const INVITE_CODE_MAX_ATTEMPTS: u32 = 8;

/// Membership roles within a room
///
/// Closed enumeration with an explicit privilege ordering:
/// Owner > Admin > Member. All role checks go through [`MemberRole::has_privilege`]
/// rather than ad hoc string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Full control: update settings, delete the room, delete any room task
    Owner,

    /// Can update room name, description, and settings
    Admin,

    /// Can create and edit tasks in the room
    Member,
}

impl MemberRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }

    /// Checks if this role meets or exceeds the required role
    pub fn has_privilege(&self, required: MemberRole) -> bool {
        self.privilege_level() >= required.privilege_level()
    }

    /// Numeric privilege level for comparison
    fn privilege_level(&self) -> u8 {
        match self {
            MemberRole::Owner => 3,
            MemberRole::Admin => 2,
            MemberRole::Member => 1,
        }
    }
}

/// Room model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    /// Unique room ID
    pub id: Uuid,

    /// Room name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user; immutable after creation
    pub owner_id: Uuid,

    /// Six-character uppercase invite code, globally unique
    pub invite_code: String,

    /// Whether the room is publicly visible
    pub is_public: bool,

    /// Whether non-admin members may share the invite code
    pub allow_member_invite: bool,

    /// Whether new room tasks are auto-assigned
    pub auto_assign_tasks: bool,

    /// When the room was created
    pub created_at: DateTime<Utc>,

    /// When the room was last updated
    pub updated_at: DateTime<Utc>,
}

/// A membership entry in a room's roster
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomMember {
    /// Room ID
    pub room_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the room
    pub role: MemberRole,

    /// When the user joined
    pub joined_at: DateTime<Utc>,
}

/// Input for creating a room
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// Room name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Public visibility (defaults to false)
    pub is_public: bool,
}

/// Input for updating a room
///
/// Only non-None fields are written. `owner_id` and `invite_code` are
/// deliberately not expressible here.
#[derive(Debug, Clone, Default)]
pub struct UpdateRoom {
    /// New name
    pub name: Option<String>,

    /// New description (Some(None) clears it)
    pub description: Option<Option<String>>,

    /// New public visibility
    pub is_public: Option<bool>,

    /// New member-invite setting
    pub allow_member_invite: Option<bool>,

    /// New auto-assign setting
    pub auto_assign_tasks: Option<bool>,
}

/// Generates a random invite code candidate
fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Checks if a database error is a unique-constraint violation on a column
fn is_unique_violation(err: &sqlx::Error, constraint_fragment: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .constraint()
            .map(|c| c.contains(constraint_fragment))
            .unwrap_or(false),
        _ => false,
    }
}

const ROOM_COLUMNS: &str = "id, name, description, owner_id, invite_code, is_public, \
     allow_member_invite, auto_assign_tasks, created_at, updated_at";

impl Room {
    /// Creates a room and auto-adds the creator as `owner`
    ///
    /// Runs in a transaction so a failed member insert leaves no orphan
    /// room. Invite-code uniqueness collisions under concurrent creation
    /// are resolved by retrying with a fresh code.
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: CreateRoom) -> Result<Self, sqlx::Error> {
        let mut attempts = 0;

        loop {
            let code = generate_invite_code();
            let mut tx = pool.begin().await?;

            let inserted = sqlx::query_as::<_, Room>(&format!(
                r#"
                INSERT INTO rooms (name, description, owner_id, invite_code, is_public)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ROOM_COLUMNS}
                "#,
            ))
            .bind(&data.name)
            .bind(&data.description)
            .bind(owner_id)
            .bind(&code)
            .bind(data.is_public)
            .fetch_one(&mut *tx)
            .await;

            let room = match inserted {
                Ok(room) => room,
                Err(e) if is_unique_violation(&e, "invite_code") => {
                    attempts += 1;
                    if attempts >= INVITE_CODE_MAX_ATTEMPTS {
                        return Err(e);
                    }
                    tracing::debug!(attempts, "Invite code collision, retrying");
                    tx.rollback().await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            sqlx::query(
                "INSERT INTO room_members (room_id, user_id, role) VALUES ($1, $2, $3)",
            )
            .bind(room.id)
            .bind(owner_id)
            .bind(MemberRole::Owner)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            return Ok(room);
        }
    }

    /// Finds a room by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a room by invite code (case-insensitive)
    pub async fn find_by_invite_code(
        pool: &PgPool,
        invite_code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE invite_code = $1"
        ))
        .bind(invite_code.to_uppercase())
        .fetch_optional(pool)
        .await
    }

    /// Lists rooms where the user is a member, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Room>(&format!(
            r#"
            SELECT r.{}
            FROM rooms r
            JOIN room_members m ON m.room_id = r.id
            WHERE m.user_id = $1
            ORDER BY r.created_at DESC
            "#,
            ROOM_COLUMNS.replace(", ", ", r."),
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Updates room fields (name, description, settings)
    ///
    /// Returns the updated room, or None if the room doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateRoom,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE rooms SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${bind_count}"));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${bind_count}"));
        }
        if data.is_public.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_public = ${bind_count}"));
        }
        if data.allow_member_invite.is_some() {
            bind_count += 1;
            query.push_str(&format!(", allow_member_invite = ${bind_count}"));
        }
        if data.auto_assign_tasks.is_some() {
            bind_count += 1;
            query.push_str(&format!(", auto_assign_tasks = ${bind_count}"));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ROOM_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Room>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(is_public) = data.is_public {
            q = q.bind(is_public);
        }
        if let Some(allow_member_invite) = data.allow_member_invite {
            q = q.bind(allow_member_invite);
        }
        if let Some(auto_assign_tasks) = data.auto_assign_tasks {
            q = q.bind(auto_assign_tasks);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a room and all tasks that reference it
    ///
    /// Transactional cascade: room tasks first, then the room (memberships
    /// cascade via foreign key). Returns true if the room existed.
    pub async fn delete_cascade(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE room_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

impl RoomMember {
    /// Adds a user to a room's roster
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the user is already a
    /// member; callers check membership first to surface a clean conflict.
    pub async fn add(
        pool: &PgPool,
        room_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RoomMember>(
            r#"
            INSERT INTO room_members (room_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING room_id, user_id, role, joined_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Removes a user from a room's roster
    ///
    /// Returns true if a membership row was removed.
    pub async fn remove(pool: &PgPool, room_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM room_members WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets a user's role in a room, None if not a member
    pub async fn role_of(
        pool: &PgPool,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemberRole>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT role FROM room_members WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Checks whether a user is a member of a room
    pub async fn is_member(
        pool: &PgPool,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Lists a room's roster ordered by join time
    pub async fn list_by_room(pool: &PgPool, room_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RoomMember>(
            r#"
            SELECT room_id, user_id, role, joined_at
            FROM room_members
            WHERE room_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(pool)
        .await
    }

    /// Counts members in a room
    pub async fn count_by_room(pool: &PgPool, room_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM room_members WHERE room_id = $1")
                .bind(room_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_as_str() {
        assert_eq!(MemberRole::Owner.as_str(), "owner");
        assert_eq!(MemberRole::Admin.as_str(), "admin");
        assert_eq!(MemberRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_privilege_ordering() {
        assert!(MemberRole::Owner.has_privilege(MemberRole::Owner));
        assert!(MemberRole::Owner.has_privilege(MemberRole::Admin));
        assert!(MemberRole::Owner.has_privilege(MemberRole::Member));

        assert!(!MemberRole::Admin.has_privilege(MemberRole::Owner));
        assert!(MemberRole::Admin.has_privilege(MemberRole::Admin));
        assert!(MemberRole::Admin.has_privilege(MemberRole::Member));

        assert!(!MemberRole::Member.has_privilege(MemberRole::Owner));
        assert!(!MemberRole::Member.has_privilege(MemberRole::Admin));
        assert!(MemberRole::Member.has_privilege(MemberRole::Member));
    }

    #[test]
    fn test_generate_invite_code_shape() {
        for _ in 0..100 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_columns_join_prefix() {
        // list_for_user prefixes every column with the table alias
        let prefixed = format!("r.{}", ROOM_COLUMNS.replace(", ", ", r."));
        assert!(prefixed.starts_with("r.id"));
        assert!(prefixed.contains("r.invite_code"));
        assert!(!prefixed.contains(", id"));
    }

    // Integration tests for database operations require a running Postgres
}
