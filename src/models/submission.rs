// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'submissions' table: one row per answer a team turns in.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub team: String,
    pub round_id: i64,

    /// Set when the round tracks answers per allocated question.
    pub question_id: Option<String>,

    pub code: Option<String>,
    pub language: Option<String>,

    /// 'Submitted', 'Correct', ... — the grading pipeline updates this.
    pub status: String,

    /// Client-measured time spent, in milliseconds.
    pub duration_ms: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for turning in a solution.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    pub round_id: i64,
    #[validate(length(max = 50))]
    pub question_id: Option<String>,
    #[validate(length(max = 100000))]
    pub code: Option<String>,
    #[validate(length(max = 20))]
    pub language: Option<String>,
    #[validate(length(max = 20))]
    pub status: Option<String>,
    pub duration_ms: Option<i64>,
}
