use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use base64::Engine;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::analytics::Analytics;
use crate::models::daily_log::{
    CompleteRoutineRequest, CompleteStepsRequest, DailyLog, UpdateDailyLogRequest,
};
use crate::services::status::{ensure_analytics, refresh_status, DailyStatus};
use crate::AppState;

/// A routine counts as done once 75% of the declared steps (rounded up) are
/// confirmed.
fn routine_complete(completed_steps: i32, total_steps: i32) -> bool {
    total_steps > 0 && completed_steps >= (total_steps * 3 + 3) / 4
}

fn parse_log_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Date must be formatted YYYY-MM-DD".into()))
}

/// Log writes require an onboarded profile; the log rows hang off the user
/// row.
async fn require_user(state: &AppState, user_id: &str) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&state.db)
        .await?;

    if exists == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(())
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DailyLog>)> {
    let mut date: Option<NaiveDate> = None;
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "date" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid date field: {e}")))?;
                date = Some(parse_log_date(&raw)?);
            }
            "photo" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !content_type.starts_with("image/") {
                    return Err(AppError::Validation("Only image files are allowed".into()));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read photo: {e}")))?;
                photo = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let date = date.ok_or(AppError::Validation("Date is required".into()))?;
    let (content_type, bytes) = photo.ok_or(AppError::Validation("No photo uploaded".into()))?;

    require_user(&state, &auth_user.id).await?;

    let existing = sqlx::query_as::<_, DailyLog>(
        "SELECT * FROM daily_logs WHERE user_id = $1 AND log_date = $2",
    )
    .bind(&auth_user.id)
    .bind(date)
    .fetch_optional(&state.db)
    .await?;

    if existing.as_ref().is_some_and(|log| log.photo_url.is_some()) {
        return Err(AppError::Conflict(
            "You have already uploaded a photo for this date".into(),
        ));
    }

    let photo_url = format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    );

    // Keyed on (user_id, log_date); COALESCE keeps the first photo if a
    // concurrent upload got there in between
    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs (id, user_id, log_date, photo_url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            photo_url = COALESCE(daily_logs.photo_url, EXCLUDED.photo_url),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(date)
    .bind(&photo_url)
    .fetch_one(&state.db)
    .await?;

    ensure_analytics(&state.db, &auth_user.id, date).await?;

    tracing::debug!(user_id = %auth_user.id, log_date = %date, "Daily photo stored");

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn complete_steps(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CompleteStepsRequest>,
) -> AppResult<Json<DailyLog>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if !body.steps.is_object() {
        return Err(AppError::Validation("steps must be an object".into()));
    }
    if body.completed_steps_count > body.total_steps_count {
        return Err(AppError::Validation(
            "completed_steps_count cannot exceed total_steps_count".into(),
        ));
    }

    require_user(&state, &auth_user.id).await?;

    let was_already_completed = sqlx::query_scalar::<_, bool>(
        "SELECT routine_completed FROM daily_logs WHERE user_id = $1 AND log_date = $2",
    )
    .bind(&auth_user.id)
    .bind(body.date)
    .fetch_optional(&state.db)
    .await?
    .unwrap_or(false);

    let completed = routine_complete(body.completed_steps_count, body.total_steps_count);

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs
            (id, user_id, log_date, routine_completed, routine_steps, total_steps, completed_steps)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            routine_completed = EXCLUDED.routine_completed,
            routine_steps = EXCLUDED.routine_steps,
            total_steps = EXCLUDED.total_steps,
            completed_steps = EXCLUDED.completed_steps,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(body.date)
    .bind(completed)
    .bind(&body.steps)
    .bind(body.total_steps_count)
    .bind(body.completed_steps_count)
    .fetch_one(&state.db)
    .await?;

    if completed && !was_already_completed {
        acknowledge_completion(&state, &auth_user.id, body.date).await?;
    }

    Ok(Json(log))
}

/// Full-completion endpoint kept for older clients that do not send
/// per-step detail.
pub async fn complete_routine(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CompleteRoutineRequest>,
) -> AppResult<Json<DailyLog>> {
    require_user(&state, &auth_user.id).await?;

    let steps = serde_json::json!({
        "cleanser": true,
        "treatment": true,
        "moisturizer": true,
        "sunscreen": false,
    });

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs
            (id, user_id, log_date, routine_completed, routine_steps, total_steps, completed_steps)
        VALUES ($1, $2, $3, TRUE, $4, 3, 3)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            routine_completed = TRUE,
            routine_steps = EXCLUDED.routine_steps,
            total_steps = EXCLUDED.total_steps,
            completed_steps = EXCLUDED.completed_steps,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(body.date)
    .bind(&steps)
    .fetch_one(&state.db)
    .await?;

    acknowledge_completion(&state, &auth_user.id, body.date).await?;

    Ok(Json(log))
}

/// A completed routine closes out a pending reset: the epoch returns to
/// `Active` and analytics accumulate again from the new baseline.
async fn acknowledge_completion(state: &AppState, user_id: &str, date: NaiveDate) -> AppResult<()> {
    ensure_analytics(&state.db, user_id, date).await?;

    let reactivated = sqlx::query(
        r#"
        UPDATE analytics SET is_reset = FALSE, updated_at = NOW()
        WHERE user_id = $1 AND is_reset = TRUE
        "#,
    )
    .bind(user_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if reactivated > 0 {
        tracing::info!(user_id = %user_id, "Analytics epoch active again after reset");
    }

    Ok(())
}

pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DailyStatus>> {
    let today = Utc::now().date_naive();
    let status = refresh_status(&state.db, &auth_user.id, today).await?;

    tracing::debug!(
        user_id = %auth_user.id,
        streak = status.streak,
        skipped_days = status.skipped_days,
        "Daily status refreshed"
    );

    Ok(Json(status))
}

#[derive(Debug, serde::Serialize)]
pub struct DailyHistory {
    pub logs: Vec<DailyLog>,
    pub analytics: Option<Analytics>,
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DailyHistory>> {
    let since = Utc::now().date_naive() - chrono::Duration::days(30);

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1 AND log_date >= $2
        ORDER BY log_date DESC
        "#,
    )
    .bind(&auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let analytics = sqlx::query_as::<_, Analytics>("SELECT * FROM analytics WHERE user_id = $1")
        .bind(&auth_user.id)
        .fetch_optional(&state.db)
        .await?;

    Ok(Json(DailyHistory { logs, analytics }))
}

pub async fn update_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateDailyLogRequest>,
) -> AppResult<Json<DailyLog>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_user(&state, &auth_user.id).await?;

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs (id, user_id, log_date, acne_level, redness_level, notes)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''))
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            acne_level = COALESCE($4, daily_logs.acne_level),
            redness_level = COALESCE($5, daily_logs.redness_level),
            notes = COALESCE($6, daily_logs.notes),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.id)
    .bind(body.date)
    .bind(body.acne_level)
    .bind(body.redness_level)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(log))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── routine_complete ─────────────────────────────────────────────────

    #[test]
    fn test_three_of_four_steps_completes() {
        assert!(routine_complete(3, 4));
        assert!(!routine_complete(2, 4));
    }

    #[test]
    fn test_three_of_three_required() {
        // ceil(3 * 0.75) = 3
        assert!(routine_complete(3, 3));
        assert!(!routine_complete(2, 3));
    }

    #[test]
    fn test_four_of_five_completes() {
        assert!(routine_complete(4, 5));
        assert!(!routine_complete(3, 5));
    }

    #[test]
    fn test_single_step_routine() {
        assert!(routine_complete(1, 1));
        assert!(!routine_complete(0, 1));
    }

    #[test]
    fn test_zero_declared_steps_never_completes() {
        assert!(!routine_complete(0, 0));
    }

    // ── parse_log_date ───────────────────────────────────────────────────

    #[test]
    fn test_parse_log_date_valid() {
        assert_eq!(
            parse_log_date("2026-08-07").unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
        );
    }

    #[test]
    fn test_parse_log_date_rejects_garbage() {
        assert!(parse_log_date("08/07/2026").is_err());
        assert!(parse_log_date("2026-13-40").is_err());
        assert!(parse_log_date("").is_err());
    }
}
