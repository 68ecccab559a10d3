//! Integration tests for the hearts economy.
//!
//! These tests verify the end-to-end behavior of:
//! - Spending hearts with lazy regeneration reconciled first
//! - Exhaustion errors when no hearts remain
//! - Time-based accrual without any background timer
//! - Next-heart countdowns
//! - Administrative refills

use stryde::{Config, HeartsConfig, LearnerId, Stryde, Timestamp};
use tempfile::tempdir;

const MINUTE_MS: i64 = 60 * 1000;

fn open_engine(dir: &tempfile::TempDir) -> Stryde {
    Stryde::open(dir.path().join("test.db"), Config::default()).unwrap()
}

// ============================================================================
// Spending Tests
// ============================================================================

#[test]
fn test_spend_heart_from_full() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    let profile = engine.spend_heart(learner.id, t0).unwrap();

    assert_eq!(profile.hearts, 4);
    // Leaving the cap starts the regeneration clock: one full interval
    assert_eq!(profile.next_heart_in_seconds, Some(30 * 60));

    engine.close().unwrap();
}

#[test]
fn test_spend_heart_persists() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    let stored = engine.get_learner(learner.id).unwrap().unwrap();
    assert_eq!(stored.hearts, 3);

    engine.close().unwrap();
}

#[test]
fn test_spend_last_heart_then_exhausted() {
    let dir = tempdir().unwrap();
    let t0 = Timestamp::from_millis(1_000_000);

    let config = Config {
        hearts: HeartsConfig {
            cap: 2,
            regen_interval_minutes: 30,
        },
        ..Default::default()
    };
    let engine = Stryde::open(dir.path().join("test.db"), config).unwrap();

    let learner = engine.create_learner("kai", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    let profile = engine.spend_heart(learner.id, t0).unwrap();
    assert_eq!(profile.hearts, 0);

    // The next spend at the same instant fails
    let err = engine.spend_heart(learner.id, t0).unwrap_err();
    assert!(err.is_hearts_exhausted());

    // Nothing was persisted by the failed spend
    let stored = engine.get_learner(learner.id).unwrap().unwrap();
    assert_eq!(stored.hearts, 0);
    assert_eq!(stored.version, 2);

    engine.close().unwrap();
}

#[test]
fn test_spend_unknown_learner() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let err = engine
        .spend_heart(LearnerId::new(), Timestamp::now())
        .unwrap_err();
    assert!(err.is_not_found());

    engine.close().unwrap();
}

// ============================================================================
// Lazy Regeneration Tests
// ============================================================================

#[test]
fn test_hearts_regenerate_over_time() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    // 3 hearts left, clock anchored at t0

    // 30 minutes later one heart has accrued
    let t1 = Timestamp::from_millis(t0.as_millis() + 30 * MINUTE_MS);
    let profile = engine.profile(learner.id, t1).unwrap();
    assert_eq!(profile.hearts, 4);

    // 65 minutes after t0: two full intervals have elapsed
    let t2 = Timestamp::from_millis(t0.as_millis() + 65 * MINUTE_MS);
    let profile = engine.profile(learner.id, t2).unwrap();
    assert_eq!(profile.hearts, 5);
    assert_eq!(profile.next_heart_in_seconds, None);

    engine.close().unwrap();
}

#[test]
fn test_regeneration_clamps_at_cap() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    // A week later only the missing heart came back
    let later = Timestamp::from_millis(t0.as_millis() + 7 * 24 * 60 * MINUTE_MS);
    let profile = engine.profile(learner.id, later).unwrap();
    assert_eq!(profile.hearts, 5);

    engine.close().unwrap();
}

#[test]
fn test_partial_interval_remainder_counts() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    // 45 minutes: one heart accrued, 15 minutes into the next interval.
    // The anchor advances by whole intervals only, so those 15 minutes
    // keep counting toward the next heart.
    let t1 = Timestamp::from_millis(t0.as_millis() + 45 * MINUTE_MS);
    let profile = engine.profile(learner.id, t1).unwrap();
    assert_eq!(profile.hearts, 4);
    assert_eq!(profile.next_heart_in_seconds, Some(15 * 60));

    engine.close().unwrap();
}

#[test]
fn test_profile_read_does_not_write() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    let t1 = Timestamp::from_millis(t0.as_millis() + 30 * MINUTE_MS);
    engine.profile(learner.id, t1).unwrap();
    engine.profile(learner.id, t1).unwrap();

    // Reads reconcile in memory; the stored record still holds the
    // pre-regeneration counter and version.
    let stored = engine.get_learner(learner.id).unwrap().unwrap();
    assert_eq!(stored.hearts, 4);
    assert_eq!(stored.version, 1);

    engine.close().unwrap();
}

#[test]
fn test_spend_reconciles_regen_first() {
    let dir = tempdir().unwrap();
    let t0 = Timestamp::from_millis(1_000_000);

    let config = Config {
        hearts: HeartsConfig {
            cap: 2,
            regen_interval_minutes: 30,
        },
        ..Default::default()
    };
    let engine = Stryde::open(dir.path().join("test.db"), config).unwrap();

    let learner = engine.create_learner("kai", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    // Exhausted at t0

    // After one interval a heart is back, so the spend succeeds and
    // lands at zero again.
    let t1 = Timestamp::from_millis(t0.as_millis() + 31 * MINUTE_MS);
    let profile = engine.spend_heart(learner.id, t1).unwrap();
    assert_eq!(profile.hearts, 0);

    engine.close().unwrap();
}

// ============================================================================
// Countdown Tests
// ============================================================================

#[test]
fn test_next_heart_none_at_cap() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    let profile = engine.profile(learner.id, t0).unwrap();

    assert_eq!(profile.hearts, 5);
    assert_eq!(profile.next_heart_in_seconds, None);

    engine.close().unwrap();
}

#[test]
fn test_next_heart_rounds_up() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    // 100ms before the heart lands the countdown still reads one second
    let almost = Timestamp::from_millis(t0.as_millis() + 30 * MINUTE_MS - 100);
    let profile = engine.profile(learner.id, almost).unwrap();
    assert_eq!(profile.hearts, 4);
    assert_eq!(profile.next_heart_in_seconds, Some(1));

    engine.close().unwrap();
}

// ============================================================================
// Admin Reset Tests
// ============================================================================

#[test]
fn test_admin_reset_refills_to_cap() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);
    let t0 = Timestamp::from_millis(1_000_000);

    let learner = engine.create_learner("maya", t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();
    engine.spend_heart(learner.id, t0).unwrap();

    let profile = engine.admin_reset_hearts(learner.id, t0).unwrap();
    assert_eq!(profile.hearts, 5);
    assert_eq!(profile.next_heart_in_seconds, None);

    // The refill is persisted
    let stored = engine.get_learner(learner.id).unwrap().unwrap();
    assert_eq!(stored.hearts, 5);

    engine.close().unwrap();
}

#[test]
fn test_admin_reset_unknown_learner() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let err = engine
        .admin_reset_hearts(LearnerId::new(), Timestamp::now())
        .unwrap_err();
    assert!(err.is_not_found());

    engine.close().unwrap();
}
