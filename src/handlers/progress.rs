// src/handlers/progress.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    catalog,
    error::AppError,
    models::{
        activity,
        team::{LeaderboardEntry, Team},
    },
    utils::jwt::Claims,
};

/// DTO for marking a round as solved.
#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
    pub round_id: i64,
}

/// Marks a round as solved by the authenticated team and awards the
/// round's XP.
///
/// Idempotent: re-solving an already-completed round neither duplicates
/// the entry nor awards XP again. The XP amount comes from the round
/// record, never from the client.
pub async fn record_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role == "admin" {
        return Err(AppError::Forbidden(
            "Admin accounts cannot record progress".to_string(),
        ));
    }

    let team_id = claims.sub.parse::<i64>().unwrap_or(0);

    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, username, email, password, role, xp, completed_rounds, created_at
        FROM teams
        WHERE id = $1
        "#,
    )
    .bind(team_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch team {}: {:?}", team_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Team not found".to_string()))?;

    let round = catalog::find_round(&pool, payload.round_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch round {}: {:?}", payload.round_id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Round not found".to_string()))?;

    let mut completed = team.completed_rounds.0.clone();
    let mut xp = team.xp;

    if !completed.contains(&round.id) {
        completed.push(round.id);
        xp += round.points;

        sqlx::query("UPDATE teams SET xp = $1, completed_rounds = $2 WHERE id = $3")
            .bind(xp)
            .bind(sqlx::types::Json(&completed))
            .bind(team.id)
            .execute(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update progress: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        if let Err(e) = activity::record(
            &pool,
            &team.username,
            "SOLVED_ROUND",
            Some(round.id),
            Some(round.points),
            &format!("Solved round {} and earned {} XP", round.id, round.points),
        )
        .await
        {
            tracing::warn!("Failed to log progress: {:?}", e);
        }
    }

    Ok(Json(json!({
        "success": true,
        "xp": xp,
        "completed_rounds": completed
    })))
}

/// Teams ordered by XP, best first. Public.
pub async fn leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT username, xp
        FROM teams
        WHERE role <> 'admin'
        ORDER BY xp DESC, username
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(entries))
}
