//! Streak and skip accounting over a user's completed-routine history.
//!
//! Both functions are pure: callers fetch the log history (descending, capped
//! at [`LOOKBACK_LIMIT`]) and pass `today` in, so the calendar math is
//! deterministic and testable. All arithmetic is on `NaiveDate` values, whole
//! calendar days, no timestamps.

use chrono::NaiveDate;

/// How many completed logs the streak walk looks back over.
pub const LOOKBACK_LIMIT: i64 = 100;

/// Completions within one day of "today" on either side still anchor a
/// streak. Client and server can disagree about what day it is; this window
/// absorbs that and must stay at exactly one day.
pub const CLOCK_SKEW_TOLERANCE_DAYS: i64 = 1;

/// Current consecutive-day streak ending at `today`.
///
/// `completed_dates` are the dates with a completed routine, most recent
/// first. Duplicate or out-of-order entries are skipped; a gap breaks the
/// walk.
pub fn compute_streak(today: NaiveDate, completed_dates: &[NaiveDate]) -> i32 {
    let Some(&most_recent) = completed_dates.first() else {
        return 0;
    };

    let days_from_today = (today - most_recent).num_days();
    if days_from_today.abs() > CLOCK_SKEW_TOLERANCE_DAYS {
        return 0;
    }

    let mut streak = 0;
    let mut expected = most_recent;

    for &date in completed_dates {
        if date == expected {
            streak += 1;
            expected -= chrono::Duration::days(1);
        } else if date < expected {
            break;
        }
        // date > expected: duplicate or out-of-order row, keep walking
    }

    streak
}

/// Consecutive fully-elapsed days since the last completed routine.
///
/// `last_completed` is the most recent completed-log date, `first_log` the
/// date of the user's first log of any kind (None when they have never
/// logged anything). Today is excluded while it can still be completed.
pub fn compute_skipped_days(
    today: NaiveDate,
    last_completed: Option<NaiveDate>,
    first_log: Option<NaiveDate>,
) -> i64 {
    let Some(last) = last_completed else {
        // Never completed: every day since the first interaction counts
        return match first_log {
            Some(first) => (today - first).num_days().max(0),
            None => 0,
        };
    };

    if last == today {
        return 0;
    }

    ((today - last).num_days() - 1).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2026, 8, 7)
    }

    // ── compute_streak ───────────────────────────────────────────────────

    #[test]
    fn test_streak_empty_history() {
        assert_eq!(compute_streak(today(), &[]), 0);
    }

    #[test]
    fn test_streak_today_and_yesterday() {
        let dates = [today(), today() - Duration::days(1)];
        assert_eq!(compute_streak(today(), &dates), 2);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        // Completed today and three days ago; the day between is missing
        let dates = [today(), today() - Duration::days(3)];
        assert_eq!(compute_streak(today(), &dates), 1);
    }

    #[test]
    fn test_streak_gap_after_two_days() {
        let dates = [
            today(),
            today() - Duration::days(1),
            today() - Duration::days(3),
            today() - Duration::days(4),
        ];
        assert_eq!(compute_streak(today(), &dates), 2);
    }

    #[test]
    fn test_streak_broken_when_two_days_stale() {
        let dates = [today() - Duration::days(2), today() - Duration::days(3)];
        assert_eq!(compute_streak(today(), &dates), 0);
    }

    #[test]
    fn test_streak_yesterday_still_counts() {
        let dates = [today() - Duration::days(1), today() - Duration::days(2)];
        assert_eq!(compute_streak(today(), &dates), 2);
    }

    #[test]
    fn test_streak_client_clock_ahead() {
        // Most recent log is "tomorrow" per an ahead client clock
        let dates = [today() + Duration::days(1), today()];
        assert_eq!(compute_streak(today(), &dates), 2);
    }

    #[test]
    fn test_streak_too_far_in_future() {
        let dates = [today() + Duration::days(2)];
        assert_eq!(compute_streak(today(), &dates), 0);
    }

    #[test]
    fn test_streak_duplicates_do_not_break_or_count() {
        let dates = [
            today(),
            today(),
            today() - Duration::days(1),
            today() - Duration::days(1),
            today() - Duration::days(2),
        ];
        assert_eq!(compute_streak(today(), &dates), 3);
    }

    #[test]
    fn test_streak_long_unbroken_run() {
        let dates: Vec<NaiveDate> = (0..40).map(|i| today() - Duration::days(i)).collect();
        assert_eq!(compute_streak(today(), &dates), 40);
    }

    // ── compute_skipped_days ─────────────────────────────────────────────

    #[test]
    fn test_skip_new_user() {
        assert_eq!(compute_skipped_days(today(), None, None), 0);
    }

    #[test]
    fn test_skip_completed_today() {
        let skipped = compute_skipped_days(today(), Some(today()), Some(today() - Duration::days(5)));
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_skip_excludes_today() {
        // Last completion yesterday: today is not over yet, nothing skipped
        let skipped = compute_skipped_days(today(), Some(today() - Duration::days(1)), None);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_skip_three_days_ago_counts_two() {
        let skipped = compute_skipped_days(today(), Some(today() - Duration::days(3)), None);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_skip_never_completed_counts_from_first_log() {
        let skipped = compute_skipped_days(today(), None, Some(today() - Duration::days(6)));
        assert_eq!(skipped, 6);
    }

    #[test]
    fn test_skip_future_completion_clamps_to_zero() {
        let skipped = compute_skipped_days(today(), Some(today() + Duration::days(1)), None);
        assert_eq!(skipped, 0);
    }

    // ── consistency between the two calculators ──────────────────────────

    #[test]
    fn test_streak_and_skip_not_both_positive() {
        // Same inputs cannot produce streak > 0 and skip > 0 together
        let histories: Vec<Vec<NaiveDate>> = vec![
            vec![],
            vec![today()],
            vec![today() - Duration::days(1)],
            vec![today() - Duration::days(4)],
            vec![today(), today() - Duration::days(1)],
        ];
        for dates in histories {
            let streak = compute_streak(today(), &dates);
            let skipped = compute_skipped_days(today(), dates.first().copied(), dates.last().copied());
            assert!(
                !(streak > 0 && skipped > 0),
                "streak {} and skipped {} both positive for {:?}",
                streak,
                skipped,
                dates
            );
        }
    }
}
