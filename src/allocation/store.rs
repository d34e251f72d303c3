// src/allocation/store.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::allocation::Allocation;

/// Errors surfaced by an allocation store.
///
/// `DuplicateKey` is the one failure callers are expected to absorb: it
/// means a concurrent create for the same (team, round) won the race and
/// the store already holds the authoritative row.
#[derive(Debug)]
pub enum StoreError {
    DuplicateKey,
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateKey => write!(f, "allocation already exists"),
            StoreError::Backend(msg) => write!(f, "allocation store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey => AppError::Conflict("Allocation already exists".to_string()),
            StoreError::Backend(msg) => AppError::InternalServerError(msg),
        }
    }
}

/// Persistence contract for team question assignments.
///
/// `create` must be atomic with respect to the (team, round_id) unique key:
/// when two creates race, exactly one succeeds and the other gets
/// `StoreError::DuplicateKey`.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    async fn find(&self, team: &str, round_id: i64) -> Result<Option<Allocation>, StoreError>;

    async fn create(&self, allocation: Allocation) -> Result<(), StoreError>;

    /// Removes one team's assignment for one round. Returns rows deleted.
    async fn delete_for_team(&self, team: &str, round_id: i64) -> Result<u64, StoreError>;

    /// Removes every assignment for the given rounds. Returns rows deleted.
    async fn delete_for_rounds(&self, round_ids: &[i64]) -> Result<u64, StoreError>;

    /// Wipes all assignments, e.g. before re-running the contest.
    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// All assignments, newest first. Admin view.
    async fn list(&self) -> Result<Vec<Allocation>, StoreError>;
}

/// Postgres-backed store. The unique index on (team, round_id) enforces
/// the one-allocation-per-key invariant.
#[derive(Clone)]
pub struct PgAllocationStore {
    pool: PgPool,
}

impl PgAllocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    async fn find(&self, team: &str, round_id: i64) -> Result<Option<Allocation>, StoreError> {
        let allocation = sqlx::query_as::<_, Allocation>(
            r#"
            SELECT team, round_id, question_ids, created_at
            FROM allocations
            WHERE team = $1 AND round_id = $2
            "#,
        )
        .bind(team)
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(allocation)
    }

    async fn create(&self, allocation: Allocation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO allocations (team, round_id, question_ids)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&allocation.team)
        .bind(allocation.round_id)
        .bind(&allocation.question_ids)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_team(&self, team: &str, round_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM allocations WHERE team = $1 AND round_id = $2")
            .bind(team)
            .bind(round_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_for_rounds(&self, round_ids: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM allocations WHERE round_id = ANY($1)")
            .bind(round_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM allocations")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list(&self) -> Result<Vec<Allocation>, StoreError> {
        let allocations = sqlx::query_as::<_, Allocation>(
            r#"
            SELECT team, round_id, question_ids, created_at
            FROM allocations
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(allocations)
    }
}

/// In-memory store implementing the same contract, for tests that exercise
/// the allocator without a database. The mutex makes check-and-insert
/// atomic, mirroring the unique-index guarantee of the Postgres store.
#[derive(Default)]
pub struct MemoryAllocationStore {
    entries: Mutex<HashMap<(String, i64), Allocation>>,
}

impl MemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<(String, i64), Allocation>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("allocation store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl AllocationStore for MemoryAllocationStore {
    async fn find(&self, team: &str, round_id: i64) -> Result<Option<Allocation>, StoreError> {
        let entries = self.entries()?;
        Ok(entries.get(&(team.to_owned(), round_id)).cloned())
    }

    async fn create(&self, mut allocation: Allocation) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        let key = (allocation.team.clone(), allocation.round_id);
        if entries.contains_key(&key) {
            return Err(StoreError::DuplicateKey);
        }
        allocation.created_at = Some(chrono::Utc::now());
        entries.insert(key, allocation);
        Ok(())
    }

    async fn delete_for_team(&self, team: &str, round_id: i64) -> Result<u64, StoreError> {
        let mut entries = self.entries()?;
        let removed = entries.remove(&(team.to_owned(), round_id));
        Ok(removed.map(|_| 1).unwrap_or(0))
    }

    async fn delete_for_rounds(&self, round_ids: &[i64]) -> Result<u64, StoreError> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|(_, round_id), _| !round_ids.contains(round_id));
        Ok((before - entries.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut entries = self.entries()?;
        let count = entries.len() as u64;
        entries.clear();
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<Allocation>, StoreError> {
        let entries = self.entries()?;
        let mut allocations: Vec<Allocation> = entries.values().cloned().collect();
        allocations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(allocations)
    }
}
