//! Daily status orchestration: recompute streak and skip counts from the log
//! history, apply the reset policy to the analytics epoch, and pick the
//! user-facing warning.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::analytics::{Analytics, EpochState};
use crate::models::daily_log::DailyLog;
use crate::services::streak::{compute_skipped_days, compute_streak, LOOKBACK_LIMIT};

/// Skip count at which the analytics epoch is rebaselined.
pub const RESET_THRESHOLD_DAYS: i64 = 4;

const RESET_MESSAGE: &str =
    "Analytics reset. Your photos are preserved, but insights start fresh.";
const WARNING_ONE_DAY: &str = "Gentle reminder: You missed yesterday. Try to stay consistent!";
const WARNING_TWO_DAYS: &str =
    "Warning: You missed 2 days. Your progress insights may be less accurate.";
const WARNING_THREE_DAYS: &str =
    "Final warning: One more missed day will reset your analytics.";

#[derive(Debug, Serialize)]
pub struct DailyStatus {
    pub streak: i32,
    pub skipped_days: i64,
    pub dataset_warning: Option<&'static str>,
    pub has_completed_today: bool,
    pub has_uploaded_today: bool,
    pub epoch_state: EpochState,
    pub today_log: Option<DailyLog>,
    pub analytics: Analytics,
}

/// The reset transition fires once per epoch: only while the epoch is still
/// `Active`.
pub fn should_reset(skipped_days: i64, is_reset: bool) -> bool {
    skipped_days >= RESET_THRESHOLD_DAYS && !is_reset
}

/// Escalating warnings for 1 to 3 skipped days. 0 means nothing to say; 4+
/// is handled by the reset path with its own message.
pub fn tier_warning(skipped_days: i64) -> Option<&'static str> {
    match skipped_days {
        1 => Some(WARNING_ONE_DAY),
        2 => Some(WARNING_TWO_DAYS),
        3 => Some(WARNING_THREE_DAYS),
        _ => None,
    }
}

/// Create the per-user analytics row if it does not exist yet, with `today`
/// as the epoch baseline, and return it. A missing analytics record is never
/// an error; a user who never onboarded is.
pub async fn ensure_analytics(db: &PgPool, user_id: &str, today: NaiveDate) -> AppResult<Analytics> {
    sqlx::query(
        r#"
        INSERT INTO analytics (user_id, baseline_date)
        SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM users WHERE id = $1)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(today)
    .execute(db)
    .await?;

    let analytics =
        sqlx::query_as::<_, Analytics>("SELECT * FROM analytics WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(analytics)
}

/// Recompute streak, skipped days and tracked-day count from the source logs,
/// apply the reset policy, and persist the refreshed aggregate.
///
/// Idempotent and safe under concurrent calls for the same user: the reset
/// transition is claimed with a conditional update, so two requests crossing
/// the threshold together clear the progress metrics exactly once.
pub async fn refresh_status(db: &PgPool, user_id: &str, today: NaiveDate) -> AppResult<DailyStatus> {
    let analytics = ensure_analytics(db, user_id, today).await?;

    let completed_dates = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT log_date FROM daily_logs
        WHERE user_id = $1 AND routine_completed
        ORDER BY log_date DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(LOOKBACK_LIMIT)
    .fetch_all(db)
    .await?;

    let first_log = sqlx::query_scalar::<_, Option<NaiveDate>>(
        "SELECT MIN(log_date) FROM daily_logs WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let total_days_tracked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM daily_logs WHERE user_id = $1 AND routine_completed",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let streak = compute_streak(today, &completed_dates);
    let skipped_days = compute_skipped_days(today, completed_dates.first().copied(), first_log);

    let mut reset_fired = false;

    if should_reset(skipped_days, analytics.is_reset) {
        // Claim the transition; the condition keeps a concurrent call from
        // clearing twice or moving the baseline a second time.
        let mut tx = db.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE analytics SET
                is_reset = TRUE,
                baseline_date = $2,
                skipped_days = 0,
                total_days_tracked = 0,
                updated_at = NOW()
            WHERE user_id = $1 AND is_reset = FALSE
            "#,
        )
        .bind(user_id)
        .bind(today)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if claimed {
            sqlx::query("DELETE FROM progress_metrics WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            reset_fired = true;
            tracing::info!(user_id = %user_id, skipped_days, "Analytics epoch reset");
        } else {
            // Lost the race: another request already reset this epoch
            tx.rollback().await?;
        }
    } else {
        sqlx::query(
            r#"
            UPDATE analytics SET
                skipped_days = $2,
                total_days_tracked = $3,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(skipped_days as i32)
        .bind(total_days_tracked as i32)
        .execute(db)
        .await?;
    }

    let analytics = sqlx::query_as::<_, Analytics>("SELECT * FROM analytics WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("analytics record missing after update"))
        })?;

    let today_log = sqlx::query_as::<_, DailyLog>(
        "SELECT * FROM daily_logs WHERE user_id = $1 AND log_date = $2",
    )
    .bind(user_id)
    .bind(today)
    .fetch_optional(db)
    .await?;

    let dataset_warning = if reset_fired {
        Some(RESET_MESSAGE)
    } else {
        tier_warning(skipped_days)
    };

    Ok(DailyStatus {
        streak,
        skipped_days,
        dataset_warning,
        has_completed_today: today_log
            .as_ref()
            .map(|log| log.routine_completed)
            .unwrap_or(false),
        has_uploaded_today: today_log
            .as_ref()
            .map(|log| log.photo_url.is_some())
            .unwrap_or(false),
        epoch_state: analytics.epoch_state(),
        today_log,
        analytics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── should_reset ─────────────────────────────────────────────────────

    #[test]
    fn test_no_reset_below_threshold() {
        assert!(!should_reset(0, false));
        assert!(!should_reset(3, false));
    }

    #[test]
    fn test_reset_at_threshold() {
        assert!(should_reset(4, false));
        assert!(should_reset(10, false));
    }

    #[test]
    fn test_reset_fires_once_per_epoch() {
        // After the flag is set, later calls in the same skip streak are no-ops
        assert!(should_reset(4, false));
        assert!(!should_reset(4, true));
        assert!(!should_reset(9, true));
    }

    // ── tier_warning ─────────────────────────────────────────────────────

    #[test]
    fn test_no_warning_when_on_track() {
        assert_eq!(tier_warning(0), None);
    }

    #[test]
    fn test_warning_tiers_are_distinct() {
        let one = tier_warning(1).unwrap();
        let two = tier_warning(2).unwrap();
        let three = tier_warning(3).unwrap();
        assert_ne!(one, two);
        assert_ne!(two, three);
        assert_ne!(one, three);
    }

    #[test]
    fn test_no_tier_warning_at_reset_threshold() {
        // 4+ is the reset path's territory, not a tier
        assert_eq!(tier_warning(4), None);
        assert_eq!(tier_warning(7), None);
    }

    #[test]
    fn test_reset_message_not_a_tier_string() {
        for skipped in 1..=3 {
            assert_ne!(tier_warning(skipped), Some(RESET_MESSAGE));
        }
    }

    #[test]
    fn test_final_warning_precedes_reset() {
        // The tier at 3 warns, the transition fires at 4
        assert!(tier_warning(3).is_some());
        assert!(should_reset(4, false));
        assert!(!should_reset(3, false));
    }
}
