// src/models/team.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'teams' table in the database.
///
/// A "team" is the authenticated participant identity. The seeded admin
/// account lives in the same table with role 'admin'.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,

    /// Unique team name, used as the login identity and as the key
    /// in allocations, activities and submissions.
    pub username: String,

    /// Contact email for the team leader.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Account role: 'team' or 'admin'.
    pub role: String,

    /// Accumulated experience points.
    pub xp: i64,

    /// Ids of rounds this team has solved.
    /// Stored as a JSON array in the database.
    pub completed_rounds: Json<Vec<i64>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for registering a new team (admin operation).
/// The server generates the password and returns it once.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterTeamRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Team name length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format."))]
    pub email: String,
}

/// DTO for team login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Leaderboard row: teams ordered by XP.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub xp: i64,
}
