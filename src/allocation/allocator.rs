// src/allocation/allocator.rs

use std::fmt;

use rand::seq::SliceRandom;

use crate::models::allocation::Allocation;
use crate::models::round::{Question, Round};

use super::store::{AllocationStore, StoreError};

/// Programming language a team can pick for a language-partitioned round.
///
/// Each language maps to a fixed identifier prefix; the pool of such a
/// round is partitioned by those prefixes (e.g. 'DP-1', 'DC-3', 'DJ-2').
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    C,
    Java,
}

impl Language {
    /// Case-insensitive parse of the client-supplied selection.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "python" => Some(Language::Python),
            "c" => Some(Language::C),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    /// Question identifier prefix for this language's pool partition.
    pub fn prefix(&self) -> &'static str {
        match self {
            Language::Python => "DP",
            Language::C => "DC",
            Language::Java => "DJ",
        }
    }

    /// Normalized tag reported back to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Java => "java",
        }
    }
}

/// Failures of the language-keyed allocation path.
#[derive(Debug)]
pub enum AllocateError {
    /// An allocation already exists for this (team, round). This path is
    /// strictly first-writer; it never overwrites.
    AlreadyAllocated,

    /// The round's pool has no question matching the requested partition.
    NoCandidates { language: Language },

    Store(StoreError),
}

impl fmt::Display for AllocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocateError::AlreadyAllocated => {
                write!(f, "question already allocated for this round")
            }
            AllocateError::NoCandidates { language } => write!(
                f,
                "no questions found for language {} (prefix {})",
                language.code(),
                language.prefix()
            ),
            AllocateError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AllocateError {}

impl From<StoreError> for AllocateError {
    fn from(err: StoreError) -> Self {
        AllocateError::Store(err)
    }
}

/// Resolves the question subset assigned to `team` for `round`.
///
/// The first call selects `round.questions_per_team` distinct questions
/// uniformly at random from the pool and persists the selection; every
/// later call returns that same selection in the same order. Two special
/// non-allocating cases return an empty list without touching the store:
/// rounds waiting on a language choice, and rounds whose pool has no
/// usable question.
///
/// Concurrent first accesses are serialized by the store's unique key:
/// if this call loses the insert race it discards its local selection and
/// returns the winner's.
pub async fn resolve(
    store: &dyn AllocationStore,
    round: &Round,
    team: &str,
) -> Result<Vec<Question>, StoreError> {
    if let Some(existing) = store.find(team, round.id).await? {
        return Ok(project(round, &existing.question_ids));
    }

    // Deliberate non-allocation, not an error: the round only hands out
    // questions once the team has picked a language.
    if round.requires_language_choice {
        return Ok(Vec::new());
    }

    let candidates = valid_candidates(round, None);
    if candidates.is_empty() {
        tracing::warn!(round_id = round.id, "round has no usable questions, skipping allocation");
        return Ok(Vec::new());
    }

    let count = round.questions_per_team.max(0) as usize;
    let selected = select_random(&candidates, count);

    let allocation = Allocation::new(team, round.id, selected);
    match store.create(allocation.clone()).await {
        Ok(()) => {
            tracing::info!(
                team,
                round_id = round.id,
                questions = ?allocation.question_ids.0,
                "allocated questions"
            );
            Ok(project(round, &allocation.question_ids))
        }
        Err(StoreError::DuplicateKey) => {
            // A concurrent resolve won the insert race; its row is now the
            // authoritative assignment.
            let winner = store.find(team, round.id).await?;
            match winner {
                Some(existing) => Ok(project(round, &existing.question_ids)),
                None => {
                    tracing::warn!(
                        team,
                        round_id = round.id,
                        "allocation vanished after duplicate-key create"
                    );
                    Ok(Vec::new())
                }
            }
        }
        Err(err) => Err(err),
    }
}

/// Allocates a single question from the partition of `round`'s pool
/// matching the chosen language. Strictly first-writer: fails with
/// `AlreadyAllocated` when any allocation exists for (team, round).
pub async fn resolve_by_language(
    store: &dyn AllocationStore,
    round: &Round,
    team: &str,
    language: Language,
) -> Result<Question, AllocateError> {
    if store.find(team, round.id).await?.is_some() {
        return Err(AllocateError::AlreadyAllocated);
    }

    let candidates = valid_candidates(round, Some(language.prefix()));
    if candidates.is_empty() {
        return Err(AllocateError::NoCandidates { language });
    }

    let selected = select_random(&candidates, 1);

    let allocation = Allocation::new(team, round.id, selected);
    let winner = match store.create(allocation.clone()).await {
        Ok(()) => {
            tracing::info!(
                team,
                round_id = round.id,
                language = language.code(),
                questions = ?allocation.question_ids.0,
                "allocated question by language"
            );
            allocation
        }
        Err(StoreError::DuplicateKey) => {
            // A concurrent allocation won the insert race; its row is the
            // authoritative assignment now.
            store
                .find(team, round.id)
                .await?
                .ok_or(AllocateError::AlreadyAllocated)?
        }
        Err(err) => return Err(err.into()),
    };

    project(round, &winner.question_ids)
        .into_iter()
        .next()
        .ok_or(AllocateError::AlreadyAllocated)
}

/// Filters the pool to questions safe to allocate: a non-empty identifier,
/// optionally restricted to one partition prefix.
fn valid_candidates<'a>(round: &'a Round, prefix: Option<&str>) -> Vec<&'a Question> {
    round
        .questions
        .iter()
        .filter(|q| !q.id.is_empty())
        .filter(|q| prefix.map(|p| q.id.starts_with(p)).unwrap_or(true))
        .collect()
}

/// Picks `count` distinct candidates uniformly at random, clamped to the
/// pool size. Shuffling the index range (Fisher-Yates) and taking a prefix
/// fixes both the subset and the order the team will see it in.
fn select_random(candidates: &[&Question], count: usize) -> Vec<String> {
    let mut indices: Vec<usize> = (0..candidates.len()).collect();
    indices.shuffle(&mut rand::thread_rng());
    indices.truncate(count.min(candidates.len()));
    indices
        .into_iter()
        .map(|i| candidates[i].id.clone())
        .collect()
}

/// Maps stored identifiers back to live pool entries, preserving stored
/// order. Identifiers whose question has since been deleted are dropped;
/// the result is simply shorter.
fn project(round: &Round, ids: &[String]) -> Vec<Question> {
    ids.iter()
        .filter_map(|id| round.questions.iter().find(|q| &q.id == id).cloned())
        .collect()
}
