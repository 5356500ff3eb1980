/// Role-based authorization decisions for rooms and tasks
///
/// These functions are pure: the caller resolves the viewer's role (or
/// lack of one) from the database, then asks here whether the action is
/// allowed. Keeping the decisions out of the handlers makes the rules
/// testable without a database.
///
/// # Permission model
///
/// 1. **Room membership**: reading a room requires being a member
/// 2. **Role hierarchy**: owner > admin > member
/// 3. **Task ownership**: the creator may always edit and delete; room
///    tasks are also editable by any room member and deletable by the
///    room's owner
///
/// # Example
///
/// ```
/// use taskrooms_shared::auth::rules::{room_update, AuthzError};
/// use taskrooms_shared::models::room::MemberRole;
///
/// assert!(room_update(Some(MemberRole::Admin)).is_ok());
/// assert!(matches!(
///     room_update(Some(MemberRole::Member)),
///     Err(AuthzError::InsufficientRole { .. })
/// ));
/// ```

use crate::models::room::MemberRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the room
    #[error("Not a member of this room")]
    NotMember,

    /// User's role is below the required one
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: MemberRole,
        actual: MemberRole,
    },

    /// User doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Requires membership at or above `required`
fn require_role(role: Option<MemberRole>, required: MemberRole) -> Result<(), AuthzError> {
    let actual = role.ok_or(AuthzError::NotMember)?;

    if actual.has_privilege(required) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { required, actual })
    }
}

/// Can the viewer see the room's details and tasks? (members only)
pub fn room_view(role: Option<MemberRole>) -> Result<(), AuthzError> {
    require_role(role, MemberRole::Member)
}

/// Can the viewer update room settings? (admin or owner)
pub fn room_update(role: Option<MemberRole>) -> Result<(), AuthzError> {
    require_role(role, MemberRole::Admin)
}

/// Can the viewer delete the room? (owner only)
pub fn room_delete(role: Option<MemberRole>) -> Result<(), AuthzError> {
    require_role(role, MemberRole::Owner)
}

/// Can the viewer share the invite code?
///
/// Admins and the owner always can; plain members only when the room
/// allows member invites.
pub fn room_invite(role: Option<MemberRole>, allow_member_invite: bool) -> Result<(), AuthzError> {
    if allow_member_invite {
        require_role(role, MemberRole::Member)
    } else {
        require_role(role, MemberRole::Admin)
    }
}

/// Can the viewer create a task inside the room? (any member)
pub fn room_create_task(role: Option<MemberRole>) -> Result<(), AuthzError> {
    require_role(role, MemberRole::Member)
}

/// Can the viewer see the task?
///
/// The creator and assignee always can; for room tasks, so can every
/// member of the room.
pub fn task_view(
    is_creator: bool,
    is_assignee: bool,
    room_role: Option<MemberRole>,
) -> Result<(), AuthzError> {
    if is_creator || is_assignee || room_role.is_some() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Can the viewer edit the task?
///
/// The creator always can; for room tasks, so can every member of the
/// room.
pub fn task_update(is_creator: bool, room_role: Option<MemberRole>) -> Result<(), AuthzError> {
    if is_creator || room_role.is_some() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Can the viewer delete the task?
///
/// The creator always can; for room tasks, so can the room's owner.
pub fn task_delete(is_creator: bool, room_role: Option<MemberRole>) -> Result<(), AuthzError> {
    if is_creator || room_role == Some(MemberRole::Owner) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_view_requires_membership() {
        assert!(room_view(Some(MemberRole::Member)).is_ok());
        assert!(room_view(Some(MemberRole::Owner)).is_ok());
        assert!(matches!(room_view(None), Err(AuthzError::NotMember)));
    }

    #[test]
    fn test_room_update_requires_admin() {
        assert!(room_update(Some(MemberRole::Owner)).is_ok());
        assert!(room_update(Some(MemberRole::Admin)).is_ok());

        assert!(matches!(
            room_update(Some(MemberRole::Member)),
            Err(AuthzError::InsufficientRole {
                required: MemberRole::Admin,
                actual: MemberRole::Member,
            })
        ));
        assert!(matches!(room_update(None), Err(AuthzError::NotMember)));
    }

    #[test]
    fn test_room_delete_requires_owner() {
        assert!(room_delete(Some(MemberRole::Owner)).is_ok());
        assert!(room_delete(Some(MemberRole::Admin)).is_err());
        assert!(room_delete(Some(MemberRole::Member)).is_err());
        assert!(room_delete(None).is_err());
    }

    #[test]
    fn test_room_invite_respects_setting() {
        // Member invites allowed: any member can share the code
        assert!(room_invite(Some(MemberRole::Member), true).is_ok());

        // Member invites disabled: admin or owner only
        assert!(room_invite(Some(MemberRole::Member), false).is_err());
        assert!(room_invite(Some(MemberRole::Admin), false).is_ok());
        assert!(room_invite(Some(MemberRole::Owner), false).is_ok());

        assert!(room_invite(None, true).is_err());
    }

    #[test]
    fn test_task_view() {
        assert!(task_view(true, false, None).is_ok());
        assert!(task_view(false, true, None).is_ok());
        assert!(task_view(false, false, Some(MemberRole::Member)).is_ok());
        assert!(matches!(
            task_view(false, false, None),
            Err(AuthzError::NotAuthorized)
        ));
    }

    #[test]
    fn test_task_update_allows_creator_and_room_members() {
        assert!(task_update(true, None).is_ok());
        assert!(task_update(false, Some(MemberRole::Member)).is_ok());
        assert!(task_update(false, Some(MemberRole::Owner)).is_ok());
        assert!(matches!(
            task_update(false, None),
            Err(AuthzError::NotAuthorized)
        ));
    }

    #[test]
    fn test_task_delete_allows_creator_and_room_owner() {
        assert!(task_delete(true, None).is_ok());
        assert!(task_delete(false, Some(MemberRole::Owner)).is_ok());

        assert!(matches!(
            task_delete(false, Some(MemberRole::Admin)),
            Err(AuthzError::NotAuthorized)
        ));
        assert!(matches!(
            task_delete(false, Some(MemberRole::Member)),
            Err(AuthzError::NotAuthorized)
        ));
        assert!(matches!(
            task_delete(false, None),
            Err(AuthzError::NotAuthorized)
        ));
    }
}
