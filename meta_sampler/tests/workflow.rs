//! Scenario tests for the sampling workflow
//!
//! Drive the full engine with hand-written fakes and check the run report
//! and audit trail.

use std::sync::atomic::Ordering;
use std::time::Duration;

use meta_sampler::{MetaError, WorkflowConfig, WorkflowEngine};
use shared::{Decision, ParticipantRef};

mod common;
use common::{FakeBattlelog, FakeLeaderboard, FakeNormalizer, TestFixtures, TestHelpers};

#[tokio::test]
async fn test_single_category_population_is_enough_at_first_evaluation() {
    // Arrange
    let config = WorkflowConfig {
        initial_batch_size: 50,
        ..TestHelpers::config(50, 20, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "Siege"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(10), battlelog, FakeNormalizer).unwrap();

    // Act
    let report = engine.run().await.unwrap();

    // Assert
    assert_eq!(report.decision, Decision::Enough);
    assert!(report.is_balanced);
    assert_eq!(report.participants_sampled, 10);
    assert_eq!(report.total, 100);
    assert_eq!(report.category_counts.get("siege"), Some(&100));
    assert_eq!(report.evaluations, 1);
    assert_eq!(report.loop_count, 0);
    assert!(report.insufficient.is_empty());
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_unreachable_total_stops_once_population_is_used() {
    let config = WorkflowConfig {
        initial_batch_size: 50,
        ..TestHelpers::config(10_000, 20, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "siege"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(20), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert!(!report.is_balanced);
    assert_eq!(report.participants_sampled, 20);
    assert_eq!(report.loop_count, 0);
    assert_eq!(report.evaluations, 1);
    assert!(!report.audit_notes.iter().any(|n| n.starts_with("sample_more")));
    assert!(report.audit_notes.iter().any(|n| n.contains("remaining_players=0")));
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_timed_out_participant_is_noted_and_skipped() {
    let config = WorkflowConfig {
        initial_batch_size: 3,
        fetch_timeout_ms: 100,
        ..TestHelpers::config(25, 5, &[TestFixtures::SIEGE])
    };
    let slow = TestFixtures::tag(1);
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "siege")).with_delay_for(&slow, Duration::from_secs(5));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(3), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    let failure = report
        .audit_notes
        .iter()
        .find(|n| n.contains("error fetching") && n.contains(&slow))
        .expect("timeout must be recorded against the slow participant");
    assert!(failure.contains("timed out"));
    assert_eq!(report.participants_fetched, 2);
    assert_eq!(report.total, 20);
    // population exhausted after the first batch
    assert_eq!(report.decision, Decision::Stop);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_failed_participant_does_not_abort_the_loop() {
    let config = TestHelpers::config(40, 10, &[TestFixtures::BAIT]);
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "bait")).failing_for(&TestFixtures::tag(0));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(30), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Enough);
    assert!(report.total >= 40);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_loop_budget_bounds_the_run() {
    let config = WorkflowConfig {
        initial_batch_size: 2,
        incremental_batch_size: 1,
        max_loops: 3,
        ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(3, "siege"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(100), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert_eq!(report.loop_count, 3);
    assert_eq!(report.evaluations, 4);
    assert_eq!(report.participants_sampled, 5);
    assert_eq!(report.cohort_sizes, vec![6, 9, 12, 15]);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_missing_mandatory_category_keeps_sampling() {
    let config = WorkflowConfig {
        initial_batch_size: 2,
        incremental_batch_size: 2,
        ..TestHelpers::config(20, 10, &[TestFixtures::SIEGE, TestFixtures::BAIT])
    };
    // only #P7 and #P8 play against bait
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "siege"))
        .with_page_for(&TestFixtures::tag(7), TestFixtures::raw_battles(10, "bait"))
        .with_page_for(&TestFixtures::tag(8), TestFixtures::raw_battles(10, "bait"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(10), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Enough);
    assert!(report.category_counts["bait"] >= 10);
    assert!(report.category_counts["siege"] >= 10);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_each_tag_fetched_at_most_once() {
    // duplicate tags in the population snapshot
    let mut population = TestFixtures::participants(6);
    population.push(ParticipantRef::new(TestFixtures::tag(0), 6));
    population.push(ParticipantRef::new(TestFixtures::tag(1), 7));
    population.push(ParticipantRef::new("", 8));

    let config = WorkflowConfig {
        initial_batch_size: 3,
        incremental_batch_size: 2,
        ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(2, "siege"));
    let calls = battlelog.calls();
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::new(population), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert_eq!(report.participants_sampled, 9);
    assert_eq!(TestHelpers::max_calls_per_tag(&calls), 1);
    assert!(!calls.lock().unwrap().contains_key(""));
    assert_eq!(report.participants_fetched, 6);
    assert_eq!(report.total, 12);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_unranked_battles_are_not_counted() {
    let config = WorkflowConfig {
        initial_batch_size: 4,
        ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
    };
    let mut page = TestFixtures::raw_battles(3, "siege");
    page.push(TestFixtures::raw_battle("siege", false));
    let engine =
        WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(4), FakeBattlelog::new(page), FakeNormalizer)
            .unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.total, 12);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_records_capped_per_participant() {
    let config = WorkflowConfig {
        initial_batch_size: 2,
        records_per_participant: 4,
        ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(25, "siege"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(2), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.total, 8);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_concurrent_fetches_capped_by_worker_limit() {
    let config = WorkflowConfig {
        initial_batch_size: 20,
        worker_limit: 3,
        ..TestHelpers::config(10, 5, &[TestFixtures::SIEGE])
    };
    let battlelog =
        FakeBattlelog::new(TestFixtures::raw_battles(1, "siege")).with_default_delay(Duration::from_millis(50));
    let peak = battlelog.peak_in_flight();
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(20), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.participants_fetched, 20);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_oversized_deadline_runs_to_completion() {
    let config = WorkflowConfig {
        initial_batch_size: 3,
        run_deadline_secs: Some(u64::MAX),
        ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(2, "siege"));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(3), battlelog, FakeNormalizer).unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert_eq!(report.total, 6);
    assert_eq!(report.evaluations, 1);
    assert!(!report.audit_notes.iter().any(|n| n.starts_with("cancelled:")));
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_deadline_cancels_in_flight_batch() {
    let config = WorkflowConfig {
        initial_batch_size: 3,
        fetch_timeout_ms: 30_000,
        run_deadline_secs: Some(1),
        ..TestHelpers::config(50, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "siege")).with_default_delay(Duration::from_secs(20));
    let engine = WorkflowEngine::new(config.clone(), FakeLeaderboard::with_size(10), battlelog, FakeNormalizer).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), engine.run())
        .await
        .expect("deadline must end the run")
        .unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert!(!report.is_balanced);
    assert_eq!(report.total, 0);
    assert!(report.audit_notes.iter().any(|n| n.contains("partial batch discarded")));
    assert!(report.audit_notes.iter().any(|n| n.starts_with("cancelled:")));
    TestHelpers::assert_report_invariants(&report, &config);
}

#[tokio::test]
async fn test_shutdown_signal_stops_running_workflow() {
    let config = WorkflowConfig {
        fetch_timeout_ms: 30_000,
        ..TestHelpers::config(50, 10, &[TestFixtures::SIEGE])
    };
    let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(10, "siege")).with_default_delay(Duration::from_secs(20));
    let engine = WorkflowEngine::new(config, FakeLeaderboard::with_size(10), battlelog, FakeNormalizer).unwrap();

    let handle = engine.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.trigger();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), engine.run())
        .await
        .expect("shutdown must end the run")
        .unwrap();

    assert_eq!(report.decision, Decision::Stop);
    assert_eq!(report.evaluations, 0);
}

#[tokio::test]
async fn test_same_seed_samples_same_participants() {
    let run = || async {
        let config = WorkflowConfig {
            initial_batch_size: 4,
            max_loops: 2,
            ..TestHelpers::config(10_000, 10, &[TestFixtures::SIEGE])
        };
        let battlelog = FakeBattlelog::new(TestFixtures::raw_battles(1, "siege"));
        let calls = battlelog.calls();
        let engine = WorkflowEngine::new(config, FakeLeaderboard::with_size(50), battlelog, FakeNormalizer).unwrap();
        let report = engine.run().await.unwrap();

        let mut fetched: Vec<String> = calls.lock().unwrap().keys().cloned().collect();
        fetched.sort();
        (report, fetched)
    };

    let (first, first_tags) = run().await;
    let (_, second_tags) = run().await;

    assert_eq!(first.participants_sampled, 8);
    assert_eq!(first_tags.len(), 8);
    assert_eq!(first_tags, second_tags);
}

#[tokio::test]
async fn test_empty_leaderboard_is_fatal() {
    let config = TestHelpers::config(50, 10, &[TestFixtures::SIEGE]);
    let engine = WorkflowEngine::new(
        config,
        FakeLeaderboard::new(Vec::new()),
        FakeBattlelog::new(Vec::new()),
        FakeNormalizer,
    )
    .unwrap();

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, MetaError::EmptyPopulation));
}
