use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user analytics aggregate. Every numeric field here is a cache over the
/// daily_logs table and is recomputed on each status read; the log history is
/// the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Analytics {
    pub user_id: String,
    pub baseline_date: NaiveDate,
    pub is_reset: bool,
    pub skipped_days: i32,
    pub total_days_tracked: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State of the analytics epoch.
///
/// Transitions:
/// - `Active -> JustReset`: 4+ consecutive skipped days, fired at most once
///   per epoch via a conditional update (see `services::status`).
/// - `JustReset -> Active`: the next recorded routine completion clears the
///   flag (`handlers::daily`). Until then the flag is sticky.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EpochState {
    Active,
    JustReset,
}

impl Analytics {
    pub fn epoch_state(&self) -> EpochState {
        if self.is_reset {
            EpochState::JustReset
        } else {
            EpochState::Active
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressMetric {
    pub id: Uuid,
    pub user_id: String,
    pub metric_date: NaiveDate,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductEvaluation {
    pub id: Uuid,
    pub user_id: String,
    pub eval_date: NaiveDate,
    pub product_name: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analytics(is_reset: bool) -> Analytics {
        Analytics {
            user_id: "user_1".into(),
            baseline_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            is_reset,
            skipped_days: 0,
            total_days_tracked: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_epoch_state_active() {
        assert_eq!(analytics(false).epoch_state(), EpochState::Active);
    }

    #[test]
    fn test_epoch_state_just_reset() {
        assert_eq!(analytics(true).epoch_state(), EpochState::JustReset);
    }
}
