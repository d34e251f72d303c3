// src/handlers/submissions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        activity,
        submission::{CreateSubmissionRequest, Submission},
    },
    utils::jwt::Claims,
};

/// Records a solution turned in by the authenticated team.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let status = payload.status.unwrap_or_else(|| "Submitted".to_string());

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (team, round_id, question_id, code, language, status, duration_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, team, round_id, question_id, code, language, status, duration_ms, created_at
        "#,
    )
    .bind(&claims.username)
    .bind(payload.round_id)
    .bind(&payload.question_id)
    .bind(&payload.code)
    .bind(&payload.language)
    .bind(&status)
    .bind(payload.duration_ms)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let seconds = submission.duration_ms.unwrap_or(0) / 1000;
    let details = match &submission.question_id {
        Some(question_id) => format!(
            "Submitted solution for round {} (question {}) in {} - duration: {}s",
            submission.round_id,
            question_id,
            submission.language.as_deref().unwrap_or("text"),
            seconds
        ),
        None => format!(
            "Submitted solution for round {} in {} - duration: {}s",
            submission.round_id,
            submission.language.as_deref().unwrap_or("text"),
            seconds
        ),
    };

    if let Err(e) = activity::record(
        &pool,
        &claims.username,
        "SUBMITTED_SOLUTION",
        Some(submission.round_id),
        None,
        &details,
    )
    .await
    {
        tracing::warn!("Failed to log submission: {:?}", e);
    }

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Most recent submissions across all teams, capped at 100.
/// Admin only.
pub async fn list_submissions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, team, round_id, question_id, code, language, status, duration_ms, created_at
        FROM submissions
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}

/// One team's submissions, newest first.
/// Admin only.
pub async fn team_submissions(
    State(pool): State<PgPool>,
    Path(team): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, team, round_id, question_id, code, language, status, duration_ms, created_at
        FROM submissions
        WHERE team = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(&team)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list submissions for {}: {:?}", team, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}
