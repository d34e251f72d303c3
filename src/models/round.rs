// src/models/round.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// One challenge item within a round's pool.
///
/// The identifier is a string unique within the round. It may carry a
/// category prefix (e.g. 'DP-1' for a Python debugging question) that the
/// language-keyed allocation path filters on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// The text of the challenge shown to the team.
    pub content: String,

    /// Question kind: 'riddle', 'debugging', 'blackbox', 'case-study'.
    /// Serialized as 'type'; `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    pub question_type: Option<String>,

    /// Programming language this question targets, if fixed.
    pub language: Option<String>,

    /// Starter or intentionally buggy code payload.
    pub code_snippet: Option<String>,

    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
}

/// Represents the 'rounds' table plus its loaded question pool.
///
/// The pool is stored in a separate 'questions' table and attached by the
/// catalog when a round is read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Round {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// 'Easy', 'Medium', 'Hard' or 'Expert'.
    pub difficulty: Option<String>,

    /// XP awarded for solving this round.
    pub points: i64,

    #[serde(rename = "type")]
    pub round_type: Option<String>,

    /// How many pool questions each team is assigned on first access.
    pub questions_per_team: i64,

    /// When set, the round is not auto-allocated: the team must first pick
    /// a programming language, which routes it through the language-keyed
    /// allocation path.
    pub requires_language_choice: bool,

    /// The question pool, in catalog order.
    #[sqlx(skip)]
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// DTO for creating a new round.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoundRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 20))]
    pub difficulty: Option<String>,
    pub points: Option<i64>,
    #[serde(rename = "type")]
    #[validate(length(max = 20))]
    pub round_type: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub questions_per_team: Option<i64>,
    pub requires_language_choice: Option<bool>,
}

/// DTO for adding a question to a round's pool.
/// The id is optional; bulk loads supply prefixed ids, otherwise one is
/// generated from the round id and pool size.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 50))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    #[serde(rename = "type")]
    #[validate(length(max = 20))]
    pub question_type: Option<String>,
    #[validate(length(max = 20))]
    pub language: Option<String>,
    #[validate(length(max = 20000))]
    pub code_snippet: Option<String>,
    #[validate(length(max = 5000))]
    pub sample_input: Option<String>,
    #[validate(length(max = 5000))]
    pub sample_output: Option<String>,
}
