//! Fuzz the level curve math.
//!
//! Any stepped curve that passes config validation must keep the level
//! derivation total and self-consistent for arbitrary XP values.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stryde::{Config, LevelCurve};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let mut thresholds: Vec<u64> = data
        .chunks_exact(2)
        .take(32)
        .map(|chunk| u64::from(u16::from_le_bytes([chunk[0], chunk[1]])))
        .collect();
    thresholds[0] = 0;

    let curve = LevelCurve::Stepped(thresholds);
    let config = Config {
        level_curve: curve.clone(),
        ..Default::default()
    };
    if config.validate().is_err() {
        return;
    }

    for xp in [0u64, 1, 9, 99, 999, 65_534, 65_535, 1_000_000] {
        let level = curve.level_for_xp(xp);
        assert!(level >= 1);

        // The derived level's threshold is affordable, the next is not
        let threshold = curve.xp_for_level(level).unwrap();
        assert!(threshold <= xp);
        if let Some(next) = curve.xp_for_level(level + 1) {
            assert!(next > xp);
        }
    }
});
