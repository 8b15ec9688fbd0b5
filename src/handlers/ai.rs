//! Storage and retrieval for client-side AI output. Analysis runs in the
//! frontend; these endpoints only persist and serve opaque payloads.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::analytics::{Analytics, ProductEvaluation, ProgressMetric};
use crate::models::user::User;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StoreProgressAnalysisRequest {
    pub analysis: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StoreProductEvaluationRequest {
    pub evaluation: serde_json::Value,
    pub product_name: String,
}

pub async fn store_progress_analysis(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<StoreProgressAnalysisRequest>,
) -> AppResult<(StatusCode, Json<ProgressMetric>)> {
    if body.analysis.is_null() {
        return Err(AppError::Validation("Analysis data is required".into()));
    }

    require_analytics(&state, &auth_user.id).await?;

    let metric = sqlx::query_as::<_, ProgressMetric>(
        r#"
        INSERT INTO progress_metrics (id, user_id, metric_date, payload)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(Utc::now().date_naive())
    .bind(&body.analysis)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn store_product_evaluation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<StoreProductEvaluationRequest>,
) -> AppResult<(StatusCode, Json<ProductEvaluation>)> {
    if body.evaluation.is_null() || body.product_name.is_empty() {
        return Err(AppError::Validation(
            "Evaluation data and product name are required".into(),
        ));
    }

    require_analytics(&state, &auth_user.id).await?;

    let evaluation = sqlx::query_as::<_, ProductEvaluation>(
        r#"
        INSERT INTO product_evaluations (id, user_id, eval_date, product_name, payload)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(Utc::now().date_naive())
    .bind(&body.product_name)
    .bind(&body.evaluation)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[derive(Debug, Serialize)]
pub struct AiUserData {
    pub user_profile: AiUserProfile,
    pub recent_logs: Vec<AiRecentLog>,
}

#[derive(Debug, Serialize)]
pub struct AiUserProfile {
    pub skin_goal: crate::models::user::SkinGoal,
    pub skin_type: crate::models::user::SkinType,
    pub total_days_tracked: i32,
}

#[derive(Debug, Serialize)]
pub struct AiRecentLog {
    pub date: NaiveDate,
    pub acne_level: Option<i32>,
    pub redness_level: Option<i32>,
    pub notes: String,
    pub has_photo: bool,
}

/// Context bundle the frontend feeds to its AI bridge.
pub async fn get_user_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<AiUserData>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(&auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    let analytics = sqlx::query_as::<_, Analytics>("SELECT * FROM analytics WHERE user_id = $1")
        .bind(&auth_user.id)
        .fetch_optional(&state.db)
        .await?;

    let recent_logs = sqlx::query_as::<_, crate::models::daily_log::DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1
        ORDER BY log_date DESC
        LIMIT 7
        "#,
    )
    .bind(&auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(AiUserData {
        user_profile: AiUserProfile {
            skin_goal: user.skin_goal,
            skin_type: user.skin_type,
            total_days_tracked: analytics.map(|a| a.total_days_tracked).unwrap_or(0),
        },
        recent_logs: recent_logs
            .into_iter()
            .map(|log| AiRecentLog {
                date: log.log_date,
                acne_level: log.acne_level,
                redness_level: log.redness_level,
                notes: log.notes,
                has_photo: log.photo_url.is_some(),
            })
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProgressMetricsResponse {
    pub progress_metrics: Vec<ProgressMetric>,
    pub total_days_tracked: i32,
    pub skipped_days: i32,
    pub baseline_date: NaiveDate,
}

pub async fn get_progress_metrics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProgressMetricsResponse>> {
    let analytics = require_analytics(&state, &auth_user.id).await?;

    let metrics = sqlx::query_as::<_, ProgressMetric>(
        r#"
        SELECT * FROM progress_metrics
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(&auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ProgressMetricsResponse {
        progress_metrics: metrics,
        total_days_tracked: analytics.total_days_tracked,
        skipped_days: analytics.skipped_days,
        baseline_date: analytics.baseline_date,
    }))
}

pub async fn get_product_evaluations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<ProductEvaluation>>> {
    require_analytics(&state, &auth_user.id).await?;

    let evaluations = sqlx::query_as::<_, ProductEvaluation>(
        r#"
        SELECT * FROM product_evaluations
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(&auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(evaluations))
}

pub async fn delete_progress_metric(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(metric_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM progress_metrics WHERE id = $1 AND user_id = $2")
        .bind(metric_id)
        .bind(&auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Progress metric not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn require_analytics(state: &AppState, user_id: &str) -> AppResult<Analytics> {
    sqlx::query_as::<_, Analytics>("SELECT * FROM analytics WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User analytics not found".into()))
}
