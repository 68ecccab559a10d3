//! Fuzz the attempt pipeline end to end.
//!
//! Arbitrary attempt fields must either apply cleanly or be rejected as
//! validation errors; the engine must never panic, and a learner read
//! after the event must still succeed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stryde::{AttemptEvent, Config, Stryde, Timestamp};

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }
    let correct = u32::from(data[0]);
    let incorrect = u32::from(data[1]);
    let xp = u64::from(u16::from_le_bytes([data[2], data[3]]));
    let day = i64::from(u16::from_le_bytes([data[4], data[5]])) % 3_650;
    let attempt_id = String::from_utf8_lossy(&data[6..]).into_owned();

    let dir = tempfile::tempdir().unwrap();
    let engine = Stryde::open(dir.path().join("fuzz.db"), Config::default()).unwrap();
    let learner = engine
        .create_learner("fuzz", Timestamp::from_millis(0))
        .unwrap();

    // Validation errors are expected outcomes here; panics are not.
    let _ = engine.apply_attempt(AttemptEvent {
        learner_id: learner.id,
        attempt_id,
        topic: None,
        correct_count: correct,
        incorrect_count: incorrect,
        xp,
        occurred_at: Timestamp::from_millis(day * 86_400_000),
    });

    let profile = engine
        .profile(learner.id, Timestamp::from_millis(day * 86_400_000))
        .unwrap();
    assert!(profile.hearts <= engine.config().hearts.cap);

    engine.close().unwrap();
});
