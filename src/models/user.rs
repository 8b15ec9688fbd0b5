use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub skin_goal: SkinGoal,
    pub skin_type: SkinType,
    pub custom_routine_steps: serde_json::Value,
    pub routine_order: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "skin_goal", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkinGoal {
    Acne,
    Glow,
    #[sqlx(rename = "healthy_skin")]
    #[serde(rename = "healthy-skin")]
    HealthySkin,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "skin_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Oily,
    Dry,
    Combination,
    Sensitive,
}

#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub skin_goal: SkinGoal,
    pub skin_type: SkinType,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoutineStepsRequest {
    pub custom_routine_steps: Option<Vec<serde_json::Value>>,
    pub routine_order: Option<Vec<String>>,
}
