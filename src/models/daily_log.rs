use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: String,
    pub log_date: NaiveDate,
    pub photo_url: Option<String>,
    pub routine_completed: bool,
    pub routine_steps: serde_json::Value,
    pub total_steps: i32,
    pub completed_steps: i32,
    pub acne_level: Option<i32>,
    pub redness_level: Option<i32>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteStepsRequest {
    pub date: NaiveDate,
    pub steps: serde_json::Value,
    #[validate(range(min = 1, message = "total_steps_count must be at least 1"))]
    pub total_steps_count: i32,
    #[validate(range(min = 0, message = "completed_steps_count must not be negative"))]
    pub completed_steps_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRoutineRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDailyLogRequest {
    pub date: NaiveDate,
    #[validate(range(min = 0, max = 10, message = "acne_level must be between 0 and 10"))]
    pub acne_level: Option<i32>,
    #[validate(range(min = 0, max = 10, message = "redness_level must be between 0 and 10"))]
    pub redness_level: Option<i32>,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}
