// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    allocation::{AllocationStore, PgAllocationStore},
    catalog,
    error::AppError,
    models::{
        activity::{self, Activity},
        round::{CreateQuestionRequest, CreateRoundRequest, Round},
        team::{RegisterTeamRequest, Team},
    },
    utils::{hash::hash_password, html::clean_html, jwt::Claims},
};

/// Registers a new team with a server-generated password.
///
/// The cleartext password is returned exactly once in the response so the
/// admin can hand it to the team leader; only the Argon2 hash is stored.
pub async fn register_team(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM teams WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if existing.is_some() {
        return Err(AppError::Conflict("Team name already exists".to_string()));
    }

    let existing_email: Option<(i64,)> = sqlx::query_as("SELECT id FROM teams WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if existing_email.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    let hashed_password = hash_password(&password)?;

    sqlx::query("INSERT INTO teams (username, email, password) VALUES ($1, $2, $3)")
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(&hashed_password)
        .execute(&pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                AppError::Conflict("Team name or email already exists".to_string())
            } else {
                tracing::error!("Failed to register team: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if let Err(e) = activity::record(
        &pool,
        &payload.username,
        "REGISTERED",
        None,
        None,
        "Team registered successfully",
    )
    .await
    {
        tracing::warn!("Failed to log registration: {:?}", e);
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Team registered",
            "team": { "username": payload.username, "email": payload.email },
            "password": password
        })),
    ))
}

/// Lists all teams. Doubles as the data source of the admin leaderboard.
/// Admin only.
pub async fn list_teams(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let teams = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, username, email, password, role, xp, completed_rounds, created_at
        FROM teams
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list teams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(teams))
}

/// Deletes a team by name.
/// Admin only. Prevents deleting self.
pub async fn delete_team(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if username == claims.username {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM teams WHERE username = $1")
        .bind(&username)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete team: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Team not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DTO for a manual XP adjustment.
#[derive(Debug, Deserialize)]
pub struct AwardXpRequest {
    pub username: String,
    /// May be negative to correct earlier mistakes.
    pub xp: i64,
    pub round_id: Option<i64>,
    pub reason: Option<String>,
}

/// Manually awards or adjusts a team's XP, optionally marking a round as
/// completed along the way.
/// Admin only.
pub async fn award_xp(
    State(pool): State<PgPool>,
    Json(payload): Json<AwardXpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, username, email, password, role, xp, completed_rounds, created_at
        FROM teams
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Team not found".to_string()))?;

    let mut completed = team.completed_rounds.0.clone();
    if let Some(round_id) = payload.round_id {
        if !completed.contains(&round_id) {
            completed.push(round_id);
        }
    }
    let xp = team.xp + payload.xp;

    sqlx::query("UPDATE teams SET xp = $1, completed_rounds = $2 WHERE id = $3")
        .bind(xp)
        .bind(sqlx::types::Json(&completed))
        .bind(team.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to award XP: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let details = payload
        .reason
        .unwrap_or_else(|| format!("Admin manually awarded {} XP", payload.xp));
    if let Err(e) = activity::record(
        &pool,
        &team.username,
        "ADMIN_AWARDED_XP",
        payload.round_id,
        Some(payload.xp),
        &details,
    )
    .await
    {
        tracing::warn!("Failed to log XP award: {:?}", e);
    }

    Ok(Json(serde_json::json!({
        "message": "XP updated successfully",
        "xp": xp
    })))
}

/// Creates a new round with an empty question pool.
/// Admin only.
pub async fn create_round(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateRoundRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let round = sqlx::query_as::<_, Round>(
        r#"
        INSERT INTO rounds
        (title, description, difficulty, points, round_type, questions_per_team, requires_language_choice)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, title, description, difficulty, points, round_type,
                  questions_per_team, requires_language_choice
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(&payload.difficulty)
    .bind(payload.points.unwrap_or(0))
    .bind(&payload.round_type)
    .bind(payload.questions_per_team.unwrap_or(1))
    .bind(payload.requires_language_choice.unwrap_or(false))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create round: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(round)))
}

/// Deletes a round and (by cascade) its question pool. Existing
/// allocations keep their rows until an explicit reset; stale references
/// are tolerated on the read path.
/// Admin only.
pub async fn delete_round(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM rounds WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete round: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Round not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to a round's pool and returns the updated round.
///
/// Bulk loads supply explicit (possibly prefix-partitioned) ids; otherwise
/// an id is generated from the round id and the pool size.
/// Admin only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Path(round_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM rounds WHERE id = $1")
        .bind(round_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if exists.is_none() {
        return Err(AppError::NotFound("Round not found".to_string()));
    }

    let pool_size: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE round_id = $1")
            .bind(round_id)
            .fetch_one(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let question_id = payload
        .id
        .unwrap_or_else(|| format!("r{}-q{}", round_id, pool_size + 1));

    sqlx::query(
        r#"
        INSERT INTO questions
        (round_id, id, content, question_type, language, code_snippet, sample_input, sample_output, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(round_id)
    .bind(&question_id)
    .bind(clean_html(&payload.content))
    .bind(&payload.question_type)
    .bind(&payload.language)
    .bind(&payload.code_snippet)
    .bind(&payload.sample_input)
    .bind(&payload.sample_output)
    .bind(pool_size + 1)
    .execute(&pool)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            AppError::Conflict(format!(
                "Question '{}' already exists in round {}",
                question_id, round_id
            ))
        } else {
            tracing::error!("Failed to add question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tracing::info!("Added question {} to round {}", question_id, round_id);

    let round = catalog::find_round(&pool, round_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Round not found".to_string()))?;

    Ok(Json(round))
}

/// DTO for editing a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub language: Option<String>,
    pub code_snippet: Option<String>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
}

/// Edits a question in place. The identifier itself never changes, so
/// existing allocations keep pointing at the edited question.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path((round_id, question_id)): Path<(i64, String)>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.content.is_none()
        && payload.question_type.is_none()
        && payload.language.is_none()
        && payload.code_snippet.is_none()
        && payload.sample_input.is_none()
        && payload.sample_output.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(content) = payload.content {
        separated.push("content = ");
        separated.push_bind_unseparated(clean_html(&content));
    }

    if let Some(question_type) = payload.question_type {
        separated.push("question_type = ");
        separated.push_bind_unseparated(question_type);
    }

    if let Some(language) = payload.language {
        separated.push("language = ");
        separated.push_bind_unseparated(language);
    }

    if let Some(code_snippet) = payload.code_snippet {
        separated.push("code_snippet = ");
        separated.push_bind_unseparated(code_snippet);
    }

    if let Some(sample_input) = payload.sample_input {
        separated.push("sample_input = ");
        separated.push_bind_unseparated(sample_input);
    }

    if let Some(sample_output) = payload.sample_output {
        separated.push("sample_output = ");
        separated.push_bind_unseparated(sample_output);
    }

    builder.push(" WHERE round_id = ");
    builder.push_bind(round_id);
    builder.push(" AND id = ");
    builder.push_bind(question_id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Removes a question from a round's pool. Allocations that reference it
/// are left in place; the read path simply returns fewer questions.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path((round_id, question_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE round_id = $1 AND id = $2")
        .bind(round_id)
        .bind(&question_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Every persisted allocation, newest first.
/// Admin only.
pub async fn list_allocations(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let store = PgAllocationStore::new(pool);
    let allocations = store.list().await?;
    Ok(Json(allocations))
}

/// Resets one team's allocation for one round; the next resolve performs
/// a fresh independent random selection.
/// Admin only.
pub async fn delete_allocation(
    State(pool): State<PgPool>,
    Path((team, round_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let store = PgAllocationStore::new(pool);
    let deleted = store.delete_for_team(&team, round_id).await?;

    if deleted == 0 {
        return Err(AppError::NotFound("Allocation not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// DTO for a bulk per-round allocation reset.
#[derive(Debug, Deserialize)]
pub struct ResetAllocationsRequest {
    pub round_ids: Vec<i64>,
}

/// Drops every allocation of the given rounds, e.g. to fix bad pool data.
/// Admin only.
pub async fn reset_allocations(
    State(pool): State<PgPool>,
    Json(payload): Json<ResetAllocationsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.round_ids.is_empty() {
        return Err(AppError::BadRequest("round_ids is required".to_string()));
    }

    let store = PgAllocationStore::new(pool);
    let deleted = store.delete_for_rounds(&payload.round_ids).await?;

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// Wipes every allocation, used when re-running the contest.
/// Admin only.
pub async fn delete_all_allocations(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let store = PgAllocationStore::new(pool);
    let deleted = store.delete_all().await?;

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// The audit trail, newest first.
/// Admin only.
pub async fn list_activities(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let activities = sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, team, action, round_id, xp_earned, details, created_at
        FROM activities
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list activities: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(activities))
}
