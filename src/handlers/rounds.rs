// src/handlers/rounds.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    allocation::{AllocateError, Language, PgAllocationStore, allocator},
    catalog,
    error::AppError,
    models::activity,
};

/// Lists every round with its full, unfiltered question pool.
/// Admin only: the full pool includes buggy-code payloads and every
/// partition, which participants must not see.
pub async fn list_rounds(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let rounds = catalog::list_rounds(&pool).await.map_err(|e| {
        tracing::error!("Failed to list rounds: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rounds))
}

/// Lists every round with the `questions` field replaced by exactly the
/// calling team's allocated subset.
///
/// First access per round triggers the one-time random allocation; after
/// that this endpoint is a pure read. Rounds waiting on a language choice
/// and rounds with an empty pool come back with an empty `questions` list,
/// which the client renders as "not yet available", not as an error.
pub async fn rounds_for_team(
    State(pool): State<PgPool>,
    Path(team): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if team.trim().is_empty() {
        return Err(AppError::BadRequest("Team name is required".to_string()));
    }

    let rounds = catalog::list_rounds(&pool).await.map_err(|e| {
        tracing::error!("Failed to list rounds: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let store = PgAllocationStore::new(pool.clone());

    let mut filtered = Vec::with_capacity(rounds.len());
    for mut round in rounds {
        let allocated = allocator::resolve(&store, &round, &team).await?;
        round.questions = allocated;
        filtered.push(round);
    }

    Ok(Json(filtered))
}

/// DTO for the language-selection allocation.
#[derive(Debug, Deserialize, Validate)]
pub struct AllocateLanguageRequest {
    #[validate(length(min = 1, max = 50))]
    pub team: String,
    pub round_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub language: String,
}

/// Allocates a single question from the partition of the round's pool
/// matching the chosen language.
///
/// Strictly first-writer: once any allocation exists for (team, round) the
/// call fails with 409 rather than overwriting. Logs the selection to the
/// activity trail.
pub async fn allocate_language(
    State(pool): State<PgPool>,
    Json(payload): Json<AllocateLanguageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let language = Language::parse(&payload.language)
        .ok_or(AppError::BadRequest("Invalid language selection".to_string()))?;

    let round = catalog::find_round(&pool, payload.round_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch round {}: {:?}", payload.round_id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Round not found".to_string()))?;

    let store = PgAllocationStore::new(pool.clone());

    let question = allocator::resolve_by_language(&store, &round, &payload.team, language)
        .await
        .map_err(|e| match e {
            AllocateError::AlreadyAllocated => AppError::Conflict(
                "Question already allocated for this round".to_string(),
            ),
            AllocateError::NoCandidates { .. } => AppError::NotFound(e.to_string()),
            AllocateError::Store(err) => err.into(),
        })?;

    // Audit trail write; not load-bearing for the allocation itself.
    if let Err(e) = activity::record(
        &pool,
        &payload.team,
        "SELECTED_LANGUAGE",
        Some(round.id),
        None,
        &format!(
            "Selected {} for round {} and got assigned question {}",
            language.code(),
            round.id,
            question.id
        ),
    )
    .await
    {
        tracing::warn!("Failed to log language selection: {:?}", e);
    }

    Ok(Json(json!({
        "message": "Question allocated successfully",
        "question_id": question.id,
        "language": language.code()
    })))
}
