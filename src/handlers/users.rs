use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::user::{UpdateRoutineStepsRequest, UpsertProfileRequest, User};
use crate::services::status::ensure_analytics;
use crate::AppState;

pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertProfileRequest>,
) -> AppResult<Json<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, skin_goal, skin_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET
            skin_goal = EXCLUDED.skin_goal,
            skin_type = EXCLUDED.skin_type,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&auth_user.id)
    .bind(&body.skin_goal)
    .bind(&body.skin_type)
    .fetch_one(&state.db)
    .await?;

    // New users get an analytics epoch starting today
    let today = Utc::now().date_naive();
    ensure_analytics(&state.db, &auth_user.id, today).await?;

    Ok(Json(user))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(&auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user))
}

pub async fn update_routine_steps(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateRoutineStepsRequest>,
) -> AppResult<Json<User>> {
    let custom_steps = body
        .custom_routine_steps
        .map(serde_json::Value::Array);
    let routine_order = body.routine_order.map(|order| {
        serde_json::Value::Array(order.into_iter().map(serde_json::Value::String).collect())
    });

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            custom_routine_steps = COALESCE($2, custom_routine_steps),
            routine_order = COALESCE($3, routine_order),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(&auth_user.id)
    .bind(custom_steps)
    .bind(routine_order)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user))
}

/// Account deletion. Logs, analytics, metrics and milestones go with the row
/// via foreign-key cascades; this is the only path that deletes log history.
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(&auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(user_id = %auth_user.id, "User profile deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
