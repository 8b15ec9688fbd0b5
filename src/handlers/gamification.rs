use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::milestone::{
    next_locked, CompleteGestureRequest, Gesture, Milestone, MilestoneKind, MilestoneUnlock,
    NextMilestone,
};
use crate::services::streak::{compute_streak, LOOKBACK_LIMIT};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UnlockedMilestone {
    pub name: &'static str,
    pub days: i32,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UpdateMilestonesResponse {
    pub milestone: Milestone,
    pub unlocks: Vec<MilestoneUnlock>,
    pub newly_unlocked: Vec<UnlockedMilestone>,
    pub streak_increased: bool,
}

/// Recompute the streak from the log history and unlock any thresholds it
/// now clears. Unlocks are keyed inserts, so repeated calls cannot award a
/// milestone twice.
pub async fn update_milestones(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UpdateMilestonesResponse>> {
    let today = Utc::now().date_naive();

    let has_analytics = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM analytics WHERE user_id = $1",
    )
    .bind(&auth_user.id)
    .fetch_one(&state.db)
    .await?;
    if has_analytics == 0 {
        return Err(AppError::NotFound("User analytics not found".into()));
    }

    let completed_dates = sqlx::query_scalar::<_, chrono::NaiveDate>(
        r#"
        SELECT log_date FROM daily_logs
        WHERE user_id = $1 AND routine_completed
        ORDER BY log_date DESC
        LIMIT $2
        "#,
    )
    .bind(&auth_user.id)
    .bind(LOOKBACK_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let current_streak = compute_streak(today, &completed_dates);

    let previous_streak = sqlx::query_scalar::<_, i32>(
        "SELECT current_streak FROM milestones WHERE user_id = $1",
    )
    .bind(&auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .unwrap_or(0);

    let milestone = sqlx::query_as::<_, Milestone>(
        r#"
        INSERT INTO milestones (user_id, current_streak, longest_streak)
        VALUES ($1, $2, $2)
        ON CONFLICT (user_id) DO UPDATE SET
            current_streak = EXCLUDED.current_streak,
            longest_streak = GREATEST(milestones.longest_streak, EXCLUDED.current_streak),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&auth_user.id)
    .bind(current_streak)
    .fetch_one(&state.db)
    .await?;

    let mut newly_unlocked = Vec::new();
    for kind in MilestoneKind::ALL {
        if current_streak < kind.threshold_days() {
            continue;
        }
        let inserted = sqlx::query(
            r#"
            INSERT INTO milestone_unlocks (user_id, kind)
            VALUES ($1, $2)
            ON CONFLICT (user_id, kind) DO NOTHING
            "#,
        )
        .bind(&auth_user.id)
        .bind(kind)
        .execute(&state.db)
        .await?
        .rows_affected();

        if inserted == 1 {
            tracing::info!(user_id = %auth_user.id, milestone = kind.title(), "Milestone unlocked");
            newly_unlocked.push(UnlockedMilestone {
                name: kind.title(),
                days: kind.threshold_days(),
                message: kind.unlock_message(),
            });
        }
    }

    let unlocks = fetch_unlocks(&state, &auth_user.id).await?;

    Ok(Json(UpdateMilestonesResponse {
        milestone,
        unlocks,
        newly_unlocked,
        streak_increased: current_streak > previous_streak,
    }))
}

#[derive(Debug, Serialize)]
pub struct GamificationStatus {
    pub milestone: Milestone,
    pub unlocks: Vec<MilestoneUnlock>,
    pub gestures: Vec<Gesture>,
    pub current_streak: i32,
    pub next_milestone: Option<NextMilestone>,
    pub total_gestures_completed: i32,
}

pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<GamificationStatus>> {
    let today = Utc::now().date_naive();

    let user_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(&auth_user.id)
        .fetch_one(&state.db)
        .await?;
    if user_exists == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    let milestone = sqlx::query_as::<_, Milestone>(
        r#"
        INSERT INTO milestones (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE
            SET updated_at = milestones.updated_at  -- no-op update to trigger RETURNING
        RETURNING *
        "#,
    )
    .bind(&auth_user.id)
    .fetch_one(&state.db)
    .await?;

    let completed_dates = sqlx::query_scalar::<_, chrono::NaiveDate>(
        r#"
        SELECT log_date FROM daily_logs
        WHERE user_id = $1 AND routine_completed
        ORDER BY log_date DESC
        LIMIT $2
        "#,
    )
    .bind(&auth_user.id)
    .bind(LOOKBACK_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let current_streak = compute_streak(today, &completed_dates);

    let unlocks = fetch_unlocks(&state, &auth_user.id).await?;
    let unlocked_kinds: Vec<MilestoneKind> = unlocks.iter().map(|u| u.kind).collect();

    let gestures = sqlx::query_as::<_, Gesture>(
        r#"
        SELECT * FROM gestures
        WHERE user_id = $1
        ORDER BY completed_at ASC
        "#,
    )
    .bind(&auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let total_gestures_completed = milestone.total_gestures_completed;

    Ok(Json(GamificationStatus {
        milestone,
        unlocks,
        gestures,
        current_streak,
        next_milestone: next_locked(&unlocked_kinds, current_streak),
        total_gestures_completed,
    }))
}

#[derive(Debug, Serialize)]
pub struct CompleteGestureResponse {
    pub gesture_type: crate::models::milestone::GestureType,
    pub milestone_triggered: MilestoneKind,
    pub impact_url: &'static str,
    pub message: &'static str,
    pub total_gestures_completed: i32,
}

pub async fn complete_gesture(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CompleteGestureRequest>,
) -> AppResult<Json<CompleteGestureResponse>> {
    let _milestone = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE user_id = $1",
    )
    .bind(&auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Milestone record not found".into()))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO gestures (id, user_id, gesture_type, milestone)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, gesture_type, milestone) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(body.gesture_type)
    .bind(body.milestone_triggered)
    .execute(&state.db)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Err(AppError::Conflict(
            "This gesture has already been completed".into(),
        ));
    }

    let total = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE milestones SET
            total_gestures_completed = total_gestures_completed + 1,
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING total_gestures_completed
        "#,
    )
    .bind(&auth_user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(CompleteGestureResponse {
        gesture_type: body.gesture_type,
        milestone_triggered: body.milestone_triggered,
        impact_url: body.gesture_type.impact_url(),
        message: body.gesture_type.completion_message(),
        total_gestures_completed: total,
    }))
}

async fn fetch_unlocks(state: &AppState, user_id: &str) -> AppResult<Vec<MilestoneUnlock>> {
    let unlocks = sqlx::query_as::<_, MilestoneUnlock>(
        r#"
        SELECT * FROM milestone_unlocks
        WHERE user_id = $1
        ORDER BY unlocked_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(unlocks)
}
