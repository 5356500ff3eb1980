/// Streak engine and task aggregates
///
/// The streak engine is a pure function over calendar days: completing a
/// task on the day after the previous completion extends the streak,
/// completing again on the same day is a no-op, and a gap of more than one
/// day resets the streak to 1. It never touches the database; callers apply
/// the returned state in a single UPDATE.
///
/// # Example
///
/// ```
/// use taskrooms_shared::stats::{advance_streak, StreakState};
/// use chrono::NaiveDate;
///
/// let day = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
///
/// let state = advance_streak(StreakState::default(), day(1));
/// assert_eq!(state.current_streak, 1);
///
/// let state = advance_streak(state, day(2));
/// assert_eq!(state.current_streak, 2);
/// assert_eq!(state.max_streak, 2);
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user streak counters as stored on the user record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Consecutive-day completion count
    pub current_streak: i32,

    /// Highest streak ever reached; always >= current_streak
    pub max_streak: i32,

    /// Calendar day of the most recent completion
    pub last_task_date: Option<NaiveDate>,
}

/// Advances the streak for a completion on `day`
///
/// `day` is the completion instant already normalized to a calendar day.
///
/// Rules, relative to the stored `last_task_date`:
///
/// - no prior completion: streak becomes 1
/// - exactly one day later: streak increments
/// - same day: unchanged (a second completion on one day never inflates
///   the streak)
/// - more than one day later: streak resets to 1
/// - **earlier** than the stored date (a backdated completion): streak and
///   `last_task_date` are left untouched. The source behavior treated this
///   as a broken streak, which punishes backdating; ignoring it is the
///   documented policy here.
///
/// `max_streak` is raised to `current_streak` whenever it falls behind.
pub fn advance_streak(state: StreakState, day: NaiveDate) -> StreakState {
    let current_streak = match state.last_task_date {
        None => 1,
        Some(last) => {
            let delta = (day - last).num_days();
            match delta {
                0 => return state,
                1 => state.current_streak + 1,
                d if d < 0 => return state,
                _ => 1,
            }
        }
    };

    StreakState {
        current_streak,
        max_streak: state.max_streak.max(current_streak),
        last_task_date: Some(day),
    }
}

/// Aggregate task counts for a scope (personal or per-room)
///
/// Pure read-side reduction computed by the store; `overdue` is only
/// populated for the personal scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskStats {
    /// All tasks in scope
    pub total: i64,

    /// Tasks with status `pending`
    pub pending: i64,

    /// Tasks with status `in_progress`
    pub in_progress: i64,

    /// Tasks with status `completed`
    pub completed: i64,

    /// Tasks due strictly before now and not completed (personal scope only)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub overdue: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_first_completion_starts_streak() {
        let state = advance_streak(StreakState::default(), day(10));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.max_streak, 1);
        assert_eq!(state.last_task_date, Some(day(10)));
    }

    #[test]
    fn test_consecutive_day_extends_streak() {
        let state = StreakState {
            current_streak: 3,
            max_streak: 5,
            last_task_date: Some(day(10)),
        };

        let next = advance_streak(state, day(11));
        assert_eq!(next.current_streak, 4);
        assert_eq!(next.max_streak, 5);
        assert_eq!(next.last_task_date, Some(day(11)));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let state = StreakState {
            current_streak: 4,
            max_streak: 5,
            last_task_date: Some(day(11)),
        };

        let next = advance_streak(state, day(11));
        assert_eq!(next, state);
    }

    #[test]
    fn test_gap_resets_streak() {
        let state = StreakState {
            current_streak: 7,
            max_streak: 7,
            last_task_date: Some(day(10)),
        };

        let next = advance_streak(state, day(13));
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.max_streak, 7);
        assert_eq!(next.last_task_date, Some(day(13)));
    }

    #[test]
    fn test_backdated_completion_is_ignored() {
        let state = StreakState {
            current_streak: 2,
            max_streak: 4,
            last_task_date: Some(day(12)),
        };

        let next = advance_streak(state, day(9));
        assert_eq!(next, state);
    }

    #[test]
    fn test_max_streak_tracks_current() {
        let mut state = StreakState::default();
        for d in 1..=5 {
            state = advance_streak(state, day(d));
        }
        assert_eq!(state.current_streak, 5);
        assert_eq!(state.max_streak, 5);

        // Break the streak; max is retained
        state = advance_streak(state, day(9));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.max_streak, 5);
    }

    #[test]
    fn test_streak_law_sequence() {
        // D, then D+1, same day again, then D+3
        let state = advance_streak(StreakState::default(), day(1));
        let state = advance_streak(state, day(2));
        assert_eq!(state.current_streak, 2);

        let state = advance_streak(state, day(2));
        assert_eq!(state.current_streak, 2);

        let state = advance_streak(state, day(5));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.max_streak, 2);
    }
}
