// src/models/allocation.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'allocations' table in the database.
///
/// One row per (team, round): the ordered subset of the round's question
/// pool assigned to that team. Written exactly once, on the team's first
/// resolution of the round, and never mutated afterwards; administrative
/// resets delete the row so a fresh selection can happen.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Allocation {
    pub team: String,
    pub round_id: i64,

    /// Question identifiers in the order the team sees them.
    /// Stored as a JSON array in the database.
    pub question_ids: Json<Vec<String>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Allocation {
    pub fn new(team: &str, round_id: i64, question_ids: Vec<String>) -> Self {
        Self {
            team: team.to_owned(),
            round_id,
            question_ids: Json(question_ids),
            created_at: None,
        }
    }
}
