// src/catalog.rs

use sqlx::PgPool;

use crate::models::round::{Question, Round};

/// Read side of the round/question catalog. The allocator treats this data
/// as read-only; admins may mutate it concurrently, which the allocator
/// tolerates by dropping identifiers that no longer resolve.

const ROUND_COLUMNS: &str = r#"
    SELECT id, title, description, difficulty, points, round_type,
           questions_per_team, requires_language_choice
    FROM rounds
"#;

/// All rounds in id order, each with its full question pool attached.
pub async fn list_rounds(pool: &PgPool) -> Result<Vec<Round>, sqlx::Error> {
    let mut rounds = sqlx::query_as::<_, Round>(&format!("{} ORDER BY id", ROUND_COLUMNS))
        .fetch_all(pool)
        .await?;

    for round in &mut rounds {
        round.questions = questions_for(pool, round.id).await?;
    }

    Ok(rounds)
}

/// One round with its pool, or None when the id is unknown.
pub async fn find_round(pool: &PgPool, id: i64) -> Result<Option<Round>, sqlx::Error> {
    let round = sqlx::query_as::<_, Round>(&format!("{} WHERE id = $1", ROUND_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match round {
        Some(mut round) => {
            round.questions = questions_for(pool, round.id).await?;
            Ok(Some(round))
        }
        None => Ok(None),
    }
}

async fn questions_for(pool: &PgPool, round_id: i64) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, content, question_type, language, code_snippet,
               sample_input, sample_output
        FROM questions
        WHERE round_id = $1
        ORDER BY position, id
        "#,
    )
    .bind(round_id)
    .fetch_all(pool)
    .await
}
