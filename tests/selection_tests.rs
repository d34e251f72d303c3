// tests/selection_tests.rs

use std::collections::HashMap;

use contest_backend::allocation::{
    AllocationStore, Language, MemoryAllocationStore, resolve, resolve_by_language,
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

/// Many distinct teams resolving the same round should select each pool
/// question about equally often. Chi-square over 5 cells, df = 4; the
/// 24.0 cutoff keeps the false-failure rate far below one in ten thousand.
#[tokio::test]
async fn selection_is_uniform_across_teams() {
    const TEAMS: usize = 5_000;

    let store = MemoryAllocationStore::new();
    let round = round(1, 1, &["q1", "q2", "q3", "q4", "q5"]);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..TEAMS {
        let team = format!("team-{}", i);
        let assigned = resolve(&store, &round, &team).await.unwrap();
        assert_eq!(assigned.len(), 1);
        *counts.entry(assigned[0].id.clone()).or_insert(0) += 1;
    }

    assert_eq!(counts.len(), 5, "every question should be selected at least once");

    let expected = TEAMS as f64 / 5.0;
    let chi_square: f64 = counts
        .values()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum();

    assert!(
        chi_square < 24.0,
        "selection distribution deviates from uniform: chi-square = {:.2}, counts = {:?}",
        chi_square,
        counts
    );
}

/// Multi-question allocations must also spread evenly: with k = 2 of 5,
/// each question should appear in about 2/5 of the assignments.
#[tokio::test]
async fn subset_selection_covers_the_pool_evenly() {
    const TEAMS: usize = 5_000;

    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["q1", "q2", "q3", "q4", "q5"]);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..TEAMS {
        let team = format!("team-{}", i);
        let assigned = resolve(&store, &round, &team).await.unwrap();
        assert_eq!(assigned.len(), 2);
        assert_ne!(assigned[0].id, assigned[1].id);
        for q in &assigned {
            *counts.entry(q.id.clone()).or_insert(0) += 1;
        }
    }

    let expected = (TEAMS * 2) as f64 / 5.0;
    let chi_square: f64 = counts
        .values()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum();

    assert!(
        chi_square < 24.0,
        "subset distribution deviates from uniform: chi-square = {:.2}, counts = {:?}",
        chi_square,
        counts
    );
}

#[tokio::test]
async fn stored_order_is_presentation_order() {
    let store = MemoryAllocationStore::new();
    let round = round(1, 2, &["q1", "q2", "q3", "q4", "q5"]);

    // Pin a specific stored order; the resolved list must match it, not
    // the pool order.
    store
        .create(Allocation::new(
            "Alpha",
            1,
            vec!["q3".to_string(), "q1".to_string()],
        ))
        .await
        .unwrap();

    let assigned = resolve(&store, &round, "Alpha").await.unwrap();
    let assigned_ids: Vec<String> = assigned.iter().map(|q| q.id.clone()).collect();
    assert_eq!(assigned_ids, vec!["q3".to_string(), "q1".to_string()]);
}

#[tokio::test]
async fn single_candidate_partition_is_deterministic() {
    let mut base = round(2, 1, &["DP-1", "DC-1", "DJ-1"]);
    base.requires_language_choice = true;

    // With exactly one question per partition, every team picking Python
    // must land on DP-1.
    for i in 0..50 {
        let store = MemoryAllocationStore::new();
        let team = format!("team-{}", i);
        let picked = resolve_by_language(&store, &base, &team, Language::Python)
            .await
            .unwrap();
        assert_eq!(picked.id, "DP-1");
    }
}

#[test]
fn language_parsing_is_case_insensitive() {
    assert_eq!(Language::parse("python"), Some(Language::Python));
    assert_eq!(Language::parse("Python"), Some(Language::Python));
    assert_eq!(Language::parse("C"), Some(Language::C));
    assert_eq!(Language::parse("JAVA"), Some(Language::Java));
    assert_eq!(Language::parse("go"), None);
    assert_eq!(Language::parse(""), None);
}

#[test]
fn language_partition_mappings() {
    assert_eq!(Language::Python.prefix(), "DP");
    assert_eq!(Language::C.prefix(), "DC");
    assert_eq!(Language::Java.prefix(), "DJ");
    assert_eq!(Language::Python.code(), "python");
    assert_eq!(Language::C.code(), "c");
    assert_eq!(Language::Java.code(), "java");
}
