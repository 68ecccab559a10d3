//! ACID and crash recovery integration tests for the Stryde engine.
//!
//! These tests verify that committed progression state carries the
//! expected durability and atomicity guarantees at the engine level.
//!
//! # Crash Simulation
//!
//! We simulate a crash by dropping the `Stryde` handle without calling
//! `close()`. Since redb durably commits data during `commit()` (not during
//! `close()`), dropping the handle simulates an ungraceful shutdown.
//!
//! redb uses shadow paging (not a WAL), so the store is always in a
//! consistent state: either a commit completed (every table it touched is
//! updated together) or it didn't (none are). There is never a
//! half-committed state, which matters here because one attempt writes
//! learner state, ledger entries, quest assignments, grants, and league
//! standings in a single transaction.

use stryde::{AttemptEvent, Config, LeagueId, LearnerId, QuestCatalog, QuestId, Stryde, Timestamp};
use tempfile::tempdir;

// 2025-01-06T00:00:00Z, a Monday
const BASE_MS: i64 = 1_736_121_600_000;

/// Helper: open an engine at the given path with default config.
fn open_default(path: &std::path::Path) -> Stryde {
    Stryde::open(path, Config::default()).unwrap()
}

fn quest_config() -> Config {
    let quests = QuestCatalog::from_json_str(
        r#"[{
            "id": "daily-correct-10",
            "title": "Sharp Ear",
            "matcher": { "kind": "correct_answers" },
            "requirement": 10,
            "reward_xp": 50
        }]"#,
    )
    .unwrap();

    Config {
        level_curve: stryde::LevelCurve::Stepped(vec![0, 100, 250, 500]),
        quests,
        ..Default::default()
    }
}

fn attempt(learner: LearnerId, attempt_id: &str, correct: u32, xp: u64, at_ms: i64) -> AttemptEvent {
    AttemptEvent {
        learner_id: learner,
        attempt_id: attempt_id.into(),
        topic: None,
        correct_count: correct,
        incorrect_count: 0,
        xp,
        occurred_at: Timestamp::from_millis(at_ms),
    }
}

// ============================================================================
// Durability Tests
// ============================================================================

#[test]
fn test_committed_learner_survives_normal_close() {
    // Basic durability: create a learner, close gracefully, reopen, verify.
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");

    let engine = open_default(&path);
    let learner = engine
        .create_learner("durable-kai", Timestamp::from_millis(BASE_MS))
        .unwrap();
    engine.close().unwrap();

    let engine = open_default(&path);
    let stored = engine.get_learner(learner.id).unwrap();
    assert!(stored.is_some(), "Data must survive a normal close");
    assert_eq!(stored.unwrap().display_name, "durable-kai");
    engine.close().unwrap();
}

#[test]
fn test_committed_attempt_survives_crash() {
    // Crash durability: apply an attempt, DROP without close (simulates
    // crash), reopen, verify both the state and its ledger entry.
    let dir = tempdir().unwrap();
    let path = dir.path().join("crash.db");

    let learner_id;
    {
        let engine = open_default(&path);
        let learner = engine
            .create_learner("kai", Timestamp::from_millis(BASE_MS))
            .unwrap();
        learner_id = learner.id;
        engine
            .apply_attempt(attempt(learner_id, "a-1", 5, 40, BASE_MS))
            .unwrap();
        // NO close() -- simulates crash (drop without flush)
    }

    let engine = open_default(&path);
    let stored = engine.get_learner(learner_id).unwrap();
    assert!(
        stored.is_some(),
        "Committed data must survive a crash (drop without close)"
    );
    assert_eq!(stored.unwrap().total_xp, 40);
    assert_eq!(engine.xp_log(learner_id, 10).unwrap().len(), 1);
    engine.close().unwrap();
}

#[test]
fn test_bulk_learners_survive_crash() {
    // Crash durability at scale: create 100 learners, crash, verify all
    // 100 are present after recovery.
    let dir = tempdir().unwrap();
    let path = dir.path().join("bulk_crash.db");

    let mut ids = Vec::new();
    {
        let engine = open_default(&path);
        for i in 0..100 {
            let learner = engine
                .create_learner(&format!("learner-{}", i), Timestamp::from_millis(BASE_MS))
                .unwrap();
            ids.push(learner.id);
        }
        // NO close() -- crash
    }

    let engine = open_default(&path);
    for id in &ids {
        assert!(
            engine.get_learner(*id).unwrap().is_some(),
            "Learner {} must be present after crash",
            id
        );
    }
    engine.close().unwrap();
}

#[test]
fn test_multiple_crash_cycles() {
    // Multiple crash/recovery cycles should not cause corruption.
    let dir = tempdir().unwrap();
    let path = dir.path().join("multi_crash.db");
    let base = Timestamp::from_millis(BASE_MS);

    // Cycle 1: create and crash
    let id1;
    {
        let engine = open_default(&path);
        id1 = engine.create_learner("cycle-1", base).unwrap().id;
    }

    // Cycle 2: verify, add more work, crash again
    let id2;
    {
        let engine = open_default(&path);
        assert!(engine.get_learner(id1).unwrap().is_some());

        id2 = engine.create_learner("cycle-2", base).unwrap().id;
        engine
            .apply_attempt(attempt(id1, "a-1", 3, 25, BASE_MS))
            .unwrap();
    }

    // Cycle 3: verify everything survived
    let engine = open_default(&path);
    assert_eq!(engine.get_learner(id1).unwrap().unwrap().total_xp, 25);
    assert!(engine.get_learner(id2).unwrap().is_some());
    assert_eq!(engine.xp_log(id1, 10).unwrap().len(), 1);
    engine.close().unwrap();
}

// ============================================================================
// Cross-Table Atomicity Tests
// ============================================================================

#[test]
fn test_attempt_commit_is_atomic_across_tables() {
    // One attempt writes learner state, ledger entries, quest progress,
    // a grant, and the league standing. After a crash, either all of them
    // are present and mutually consistent or none are.
    let dir = tempdir().unwrap();
    let path = dir.path().join("atomic.db");

    let learner_id;
    {
        let engine = Stryde::open(&path, quest_config()).unwrap();
        let base = Timestamp::from_millis(BASE_MS);

        let learner = engine.create_learner("maya", base).unwrap();
        learner_id = learner.id;
        engine
            .join_league(learner_id, LeagueId::new(), 0, base)
            .unwrap();
        engine
            .assign_quest(learner_id, &QuestId::new("daily-correct-10"), base)
            .unwrap();

        // 40 attempt XP plus the 50 XP quest reward, in one commit
        let outcome = engine
            .apply_attempt(attempt(learner_id, "a-1", 10, 40, BASE_MS))
            .unwrap();
        assert_eq!(outcome.xp_awarded, 90);
        // NO close() -- crash
    }

    let engine = Stryde::open(&path, quest_config()).unwrap();

    // The ledger accounts for every XP point on the learner
    let stored = engine.get_learner(learner_id).unwrap().unwrap();
    let log = engine.xp_log(learner_id, 100).unwrap();
    let ledger_total: i64 = log.iter().map(|entry| entry.amount).sum();
    assert_eq!(stored.total_xp, 90);
    assert_eq!(ledger_total, 90);

    // The quest completed in the same commit, and its reward was paid
    // exactly once
    let progress = engine.quest_progress(learner_id).unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress[0].completed);
    assert_eq!(progress[0].progress, 10);
    assert_eq!(log.len(), 2);

    // The standing accumulated the full award
    let standing = engine
        .standing(learner_id, Timestamp::from_millis(BASE_MS))
        .unwrap()
        .unwrap();
    assert_eq!(standing.weekly_xp, 90);

    engine.close().unwrap();
}

#[test]
fn test_replay_after_crash_does_not_double_grant() {
    // A client that lost its ack re-sends the attempt after the engine
    // restarts. The repeatable attempt XP lands again but the one-time
    // quest reward stays latched.
    let dir = tempdir().unwrap();
    let path = dir.path().join("replay.db");

    let learner_id;
    {
        let engine = Stryde::open(&path, quest_config()).unwrap();
        let base = Timestamp::from_millis(BASE_MS);

        let learner = engine.create_learner("maya", base).unwrap();
        learner_id = learner.id;
        engine
            .assign_quest(learner_id, &QuestId::new("daily-correct-10"), base)
            .unwrap();
        let outcome = engine
            .apply_attempt(attempt(learner_id, "a-1", 10, 40, BASE_MS))
            .unwrap();
        assert_eq!(outcome.xp_awarded, 90);
        // NO close() -- crash before the client hears back
    }

    let engine = Stryde::open(&path, quest_config()).unwrap();
    let replay = engine
        .apply_attempt(attempt(learner_id, "a-1", 10, 40, BASE_MS))
        .unwrap();

    // Only the attempt XP recurs; the quest stays completed and unpaid
    assert_eq!(replay.xp_awarded, 40);
    assert!(replay.completed_quests.is_empty());

    let stored = engine.get_learner(learner_id).unwrap().unwrap();
    assert_eq!(stored.total_xp, 130);
    assert_eq!(engine.xp_log(learner_id, 10).unwrap().len(), 3);

    engine.close().unwrap();
}
