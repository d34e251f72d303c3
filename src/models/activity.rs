// src/models/activity.rs

use sqlx::{PgPool, prelude::FromRow};
use serde::{Deserialize, Serialize};

/// Represents the 'activities' table: the append-only audit trail shown in
/// the admin panel.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub team: String,

    /// Action tag, e.g. 'REGISTERED', 'SOLVED_ROUND', 'SELECTED_LANGUAGE'.
    pub action: String,

    pub round_id: Option<i64>,
    pub xp_earned: Option<i64>,
    pub details: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Appends one audit record. Failures are the caller's to handle; most
/// call sites log and continue since the audit trail is not load-bearing.
pub async fn record(
    pool: &PgPool,
    team: &str,
    action: &str,
    round_id: Option<i64>,
    xp_earned: Option<i64>,
    details: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO activities (team, action, round_id, xp_earned, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(team)
    .bind(action)
    .bind(round_id)
    .bind(xp_earned)
    .bind(details)
    .execute(pool)
    .await?;

    Ok(())
}
