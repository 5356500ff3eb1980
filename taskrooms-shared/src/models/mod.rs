/// Database models for taskrooms
///
/// # Models
///
/// - `user`: User accounts, productivity counters, and streak storage
/// - `room`: Collaboration rooms, member rosters, and invite codes
/// - `task`: Tasks with status/priority, room association, and filtering

pub mod room;
pub mod task;
pub mod user;

/// Escapes LIKE wildcards in user-supplied search text
pub(crate) fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
