//! Fuzz the JSON catalog loaders.
//!
//! Arbitrary input must either parse into a catalog or come back as an
//! error; it must never panic. A catalog that passes config validation
//! must honor the documented semantic guarantees.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stryde::{AchievementCatalog, Config, QuestCatalog};

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return,
    };

    if let Ok(quests) = QuestCatalog::from_json_str(text) {
        let config = Config {
            quests,
            ..Default::default()
        };
        if config.validate().is_ok() {
            for definition in config.quests.iter() {
                assert!(definition.requirement > 0);
                assert!(!definition.id.as_str().is_empty());
            }
        }
    }

    if let Ok(achievements) = AchievementCatalog::from_json_str(text) {
        let config = Config {
            achievements,
            ..Default::default()
        };
        let _ = config.validate();
    }
});
