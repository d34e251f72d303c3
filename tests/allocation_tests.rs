// tests/allocation_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use contest_backend::allocation::{
    AllocateError, AllocationStore, Language, MemoryAllocationStore, StoreError, resolve,
    resolve_by_language,
};
use contest_backend::models::allocation::Allocation;
use contest_backend::models::round::{Question, Round};

fn question(id: &str) -> Question {
    Question {
        id: id.to_string(),
        content: format!("Question {}", id),
        question_type: None,
        language: None,
        code_snippet: None,
        sample_input: None,
        sample_output: None,
    }
}

fn round(id: i64, questions_per_team: i64, ids: &[&str]) -> Round {
    Round {
        id,
        title: format!("Round {}", id),
        description: None,
        difficulty: None,
        points: 100,
        round_type: None,
        questions_per_team,
        requires_language_choice: false,
        questions: ids.iter().map(|id| question(id)).collect(),
    }
}

fn ids(questions: &[Question]) -> Vec<String> {
    questions.iter().map(|q| q.id.clone()).collect()
}

#[tokio::test]
async fn first_resolve_persists_and_repeats() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["q1", "q2", "q3", "q4", "q5"]);

    let first = resolve(&store, &round, "Alpha").await.unwrap();
    assert_eq!(first.len(), 2);

    // Calls 2..N return the stored list, identically ordered.
    for _ in 0..5 {
        let again = resolve(&store, &round, "Alpha").await.unwrap();
        assert_eq!(ids(&again), ids(&first));
    }

    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn teams_get_independent_allocations() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["q1", "q2", "q3", "q4", "q5"]);
    let pool_ids = ids(&round.questions);

    let alpha = ids(&resolve(&store, &round, "Alpha").await.unwrap());
    let beta = ids(&resolve(&store, &round, "Beta").await.unwrap());

    for selection in [&alpha, &beta] {
        assert_eq!(selection.len(), 2);
        assert!(selection.iter().all(|id| pool_ids.contains(id)));
        assert_ne!(selection[0], selection[1], "selection must be distinct");
    }

    // Each team's assignment stays stable regardless of the other's.
    assert_eq!(ids(&resolve(&store, &round, "Alpha").await.unwrap()), alpha);
    assert_eq!(ids(&resolve(&store, &round, "Beta").await.unwrap()), beta);
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleted_question_shortens_result_but_keeps_order() {
    let store = MemoryAllocationStore::new();
    let full = round(1, 3, &["q1", "q2", "q3"]);

    let assigned = ids(&resolve(&store, &full, "Alpha").await.unwrap());
    assert_eq!(assigned.len(), 3);

    // An admin deletes q2 from the pool after allocation.
    let mut shrunk = full.clone();
    shrunk.questions.retain(|q| q.id != "q2");

    let after = ids(&resolve(&store, &shrunk, "Alpha").await.unwrap());
    let expected: Vec<String> = assigned.iter().filter(|id| *id != "q2").cloned().collect();
    assert_eq!(after, expected);
}

#[tokio::test]
async fn allocation_count_is_clamped_to_pool_size() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 5, &["q1", "q2"]);

    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    assert_eq!(assigned.len(), 2);
}

#[tokio::test]
async fn empty_pool_allocates_nothing() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 1, &[]);

    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    assert!(assigned.is_empty());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_questions_are_skipped() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["", "q1"]);

    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    assert_eq!(ids(&assigned), vec!["q1".to_string()]);

    let stored = store.find("Alpha", 1).await.unwrap().unwrap();
    assert_eq!(stored.question_ids.0, vec!["q1".to_string()]);
}

#[tokio::test]
async fn language_choice_round_defers_allocation() {
    let store = MemoryAllocationStore::new();
    let mut round = round(2, 1, &["DP-1", "DC-1", "DJ-1"]);
    round.requires_language_choice = true;

    // Empty until the team picks a language; nothing is persisted.
    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    assert!(assigned.is_empty());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn language_allocation_picks_from_matching_partition() {
    let store = MemoryAllocationStore::new();
    let mut round = round(2, 1, &["DP-1", "DP-2", "DC-1", "DJ-1"]);
    round.requires_language_choice = true;

    let picked = resolve_by_language(&store, &round, "Alpha", Language::Python)
        .await
        .unwrap();
    assert!(picked.id.starts_with("DP"));

    // The regular resolve path now returns the manual selection.
    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    assert_eq!(ids(&assigned), vec![picked.id]);
}

#[tokio::test]
async fn language_allocation_is_first_writer_only() {
    let store = MemoryAllocationStore::new();
    let mut round = round(2, 1, &["DP-1", "DC-1", "DJ-1"]);
    round.requires_language_choice = true;

    resolve_by_language(&store, &round, "Alpha", Language::Python)
        .await
        .unwrap();

    // A second selection must fail, even with a different language.
    let second = resolve_by_language(&store, &round, "Alpha", Language::C).await;
    assert!(matches!(second, Err(AllocateError::AlreadyAllocated)));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn language_allocation_fails_on_empty_partition() {
    let store = MemoryAllocationStore::new();
    let mut round = round(2, 1, &["DP-1", "DP-2"]);
    round.requires_language_choice = true;

    let result = resolve_by_language(&store, &round, "Alpha", Language::Java).await;
    match result {
        Err(AllocateError::NoCandidates { language }) => assert_eq!(language, Language::Java),
        other => panic!("expected NoCandidates, got {:?}", other.map(|q| q.id)),
    }
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn reset_allows_a_fresh_selection() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["q1", "q2", "q3", "q4", "q5"]);
    let pool_ids = ids(&round.questions);

    resolve(&store, &round, "Alpha").await.unwrap();
    assert_eq!(store.delete_for_team("Alpha", 1).await.unwrap(), 1);
    assert!(store.find("Alpha", 1).await.unwrap().is_none());

    // Fresh independent selection; it may or may not equal the old one.
    let again = ids(&resolve(&store, &round, "Alpha").await.unwrap());
    assert_eq!(again.len(), 2);
    assert!(again.iter().all(|id| pool_ids.contains(id)));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_resets_delete_by_round_and_all() {
    let store = MemoryAllocationStore::new();
    let round_one = round(1, 1, &["q1", "q2"]);
    let round_two = round(2, 1, &["q3", "q4"]);

    for team in ["Alpha", "Beta"] {
        resolve(&store, &round_one, team).await.unwrap();
        resolve(&store, &round_two, team).await.unwrap();
    }
    assert_eq!(store.list().await.unwrap().len(), 4);

    assert_eq!(store.delete_for_rounds(&[1]).await.unwrap(), 2);
    assert_eq!(store.list().await.unwrap().len(), 2);

    assert_eq!(store.delete_all().await.unwrap(), 2);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn store_rejects_duplicate_keys() {
    let store = MemoryAllocationStore::new();

    store
        .create(Allocation::new("Alpha", 1, vec!["q1".to_string()]))
        .await
        .unwrap();

    let duplicate = store
        .create(Allocation::new("Alpha", 1, vec!["q2".to_string()]))
        .await;
    assert!(matches!(duplicate, Err(StoreError::DuplicateKey)));

    // The first write stays authoritative.
    let stored = store.find("Alpha", 1).await.unwrap().unwrap();
    assert_eq!(stored.question_ids.0, vec!["q1".to_string()]);
}

/// Store wrapper that counts create outcomes, to pin down how the race is
/// resolved: exactly one insert commits, every loser falls back to a read.
struct CountingStore {
    inner: MemoryAllocationStore,
    create_successes: AtomicUsize,
    create_duplicates: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryAllocationStore::new(),
            create_successes: AtomicUsize::new(0),
            create_duplicates: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl AllocationStore for CountingStore {
    async fn find(&self, team: &str, round_id: i64) -> Result<Option<Allocation>, StoreError> {
        self.inner.find(team, round_id).await
    }

    async fn create(&self, allocation: Allocation) -> Result<(), StoreError> {
        match self.inner.create(allocation).await {
            Ok(()) => {
                self.create_successes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(StoreError::DuplicateKey) => {
                self.create_duplicates.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::DuplicateKey)
            }
            Err(err) => Err(err),
        }
    }

    async fn delete_for_team(&self, team: &str, round_id: i64) -> Result<u64, StoreError> {
        self.inner.delete_for_team(team, round_id).await
    }

    async fn delete_for_rounds(&self, round_ids: &[i64]) -> Result<u64, StoreError> {
        self.inner.delete_for_rounds(round_ids).await
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.inner.delete_all().await
    }

    async fn list(&self) -> Result<Vec<Allocation>, StoreError> {
        self.inner.list().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_access_creates_exactly_once() {
    const CALLERS: usize = 16;

    let store = Arc::new(CountingStore::new());
    let round = Arc::new(round(9, 2, &["q1", "q2", "q3", "q4", "q5"]));
    let team = format!("team-{}", uuid::Uuid::new_v4());
    let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));

    let mut handles = Vec::with_capacity(CALLERS);
    for _ in 0..CALLERS {
        let store = store.clone();
        let round = round.clone();
        let team = team.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let assigned = resolve(store.as_ref(), &round, &team).await.unwrap();
            ids(&assigned)
        }));
    }

    let mut results = Vec::with_capacity(CALLERS);
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    // Every caller sees the same ordered list, and only one insert won.
    let first = &results[0];
    assert_eq!(first.len(), 2);
    assert!(results.iter().all(|r| r == first));
    assert_eq!(store.create_successes.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.list().await.unwrap().len(), 1);
}
